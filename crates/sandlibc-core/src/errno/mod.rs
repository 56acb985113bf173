//! Error number definitions and their messages.
//!
//! Implements `<errno.h>` constants (Linux numbering) and the `strerror`
//! table. The current errno value is runtime state, see
//! [`crate::Runtime::errno`].

pub const EPERM: i32 = 1;
pub const ENOENT: i32 = 2;
pub const ESRCH: i32 = 3;
pub const EINTR: i32 = 4;
pub const EIO: i32 = 5;
pub const ENXIO: i32 = 6;
pub const E2BIG: i32 = 7;
pub const ENOEXEC: i32 = 8;
pub const EBADF: i32 = 9;
pub const ECHILD: i32 = 10;
pub const EAGAIN: i32 = 11;
pub const EWOULDBLOCK: i32 = EAGAIN;
pub const ENOMEM: i32 = 12;
pub const EACCES: i32 = 13;
pub const EFAULT: i32 = 14;
pub const EBUSY: i32 = 16;
pub const EEXIST: i32 = 17;
pub const EXDEV: i32 = 18;
pub const ENODEV: i32 = 19;
pub const ENOTDIR: i32 = 20;
pub const EISDIR: i32 = 21;
pub const EINVAL: i32 = 22;
pub const ENFILE: i32 = 23;
pub const EMFILE: i32 = 24;
pub const ENOTTY: i32 = 25;
pub const ETXTBSY: i32 = 26;
pub const EFBIG: i32 = 27;
pub const ENOSPC: i32 = 28;
pub const ESPIPE: i32 = 29;
pub const EROFS: i32 = 30;
pub const EMLINK: i32 = 31;
pub const EPIPE: i32 = 32;
pub const EDOM: i32 = 33;
pub const ERANGE: i32 = 34;
pub const EDEADLK: i32 = 35;
pub const ENAMETOOLONG: i32 = 36;
pub const ENOSYS: i32 = 38;
pub const ENOTEMPTY: i32 = 39;
pub const ELOOP: i32 = 40;
pub const ENOMSG: i32 = 42;
pub const EIDRM: i32 = 43;
pub const ENOSTR: i32 = 60;
pub const ENODATA: i32 = 61;
pub const ETIME: i32 = 62;
pub const ENOSR: i32 = 63;
pub const ENOLINK: i32 = 67;
pub const EPROTO: i32 = 71;
pub const EBADMSG: i32 = 74;
pub const EOVERFLOW: i32 = 75;
pub const EILSEQ: i32 = 84;
pub const ENOTSOCK: i32 = 88;
pub const EDESTADDRREQ: i32 = 89;
pub const EMSGSIZE: i32 = 90;
pub const EPROTOTYPE: i32 = 91;
pub const ENOPROTOOPT: i32 = 92;
pub const EPROTONOSUPPORT: i32 = 93;
pub const EOPNOTSUPP: i32 = 95;
pub const ENOTSUP: i32 = EOPNOTSUPP;
pub const EAFNOSUPPORT: i32 = 97;
pub const EADDRINUSE: i32 = 98;
pub const EADDRNOTAVAIL: i32 = 99;
pub const ENETDOWN: i32 = 100;
pub const ENETUNREACH: i32 = 101;
pub const ENETRESET: i32 = 102;
pub const ECONNABORTED: i32 = 103;
pub const ECONNRESET: i32 = 104;
pub const ENOBUFS: i32 = 105;
pub const EISCONN: i32 = 106;
pub const ENOTCONN: i32 = 107;
pub const ETIMEDOUT: i32 = 110;
pub const ECONNREFUSED: i32 = 111;
pub const EHOSTUNREACH: i32 = 113;
pub const EALREADY: i32 = 114;
pub const EINPROGRESS: i32 = 115;
pub const ECANCELED: i32 = 125;
pub const EOWNERDEAD: i32 = 130;
pub const ENOTRECOVERABLE: i32 = 131;

/// Message for codes missing from the table.
pub const UNKNOWN_ERROR: &str = "Unknown error code";

// Aliases share a number; the first entry wins.
const MESSAGES: &[(i32, &str)] = &[
    (0, "Success"),
    (EAFNOSUPPORT, "Address family is not supported"),
    (EADDRINUSE, "Address already in use"),
    (EADDRNOTAVAIL, "Address not available"),
    (EISCONN, "Already connected"),
    (E2BIG, "Argument list too long"),
    (EDOM, "Argument out of domain"),
    (EFAULT, "Bad address"),
    (EBADF, "Bad file descriptor"),
    (EBADMSG, "Bad message"),
    (EPIPE, "Broken pipe"),
    (ECONNABORTED, "Connection aborted"),
    (EALREADY, "Connection already in progress"),
    (ECONNREFUSED, "Connection refused"),
    (ECONNRESET, "Connection reset"),
    (EXDEV, "Cross device link"),
    (EDESTADDRREQ, "Destination address required"),
    (EBUSY, "Device or resource busy"),
    (ENOTEMPTY, "Directory not empty"),
    (ENOEXEC, "Executable format error"),
    (EEXIST, "File already exists"),
    (EFBIG, "File too large"),
    (ENAMETOOLONG, "Filename too long"),
    (ENOSYS, "Function not supported"),
    (EHOSTUNREACH, "Host is unreachable"),
    (EIDRM, "Identifier removed"),
    (EILSEQ, "Illegal byte sequence"),
    (ENOTTY, "Inappropriate IO control operation"),
    (EINTR, "Interrupted"),
    (EINVAL, "Invalid argument"),
    (ESPIPE, "Invalid seek"),
    (EIO, "IO error"),
    (EISDIR, "Is a directory"),
    (EMSGSIZE, "Message size"),
    (ENETDOWN, "Network down"),
    (ENETRESET, "Network reset"),
    (ENETUNREACH, "Network unreachable"),
    (ENOBUFS, "No buffer space"),
    (ECHILD, "No child process"),
    (ENOLINK, "No link"),
    (ENOMSG, "No message"),
    (ENODATA, "No message available"),
    (ENOPROTOOPT, "No protocol option"),
    (ENOSPC, "No space on device"),
    (ENOSR, "No stream resources"),
    (ENODEV, "No such device"),
    (ENXIO, "No such device or address"),
    (ENOENT, "No such file or directory"),
    (ESRCH, "No such process"),
    (ENOTDIR, "Not a directory"),
    (ENOTSOCK, "Not a socket"),
    (ENOSTR, "Not a stream"),
    (ENOTCONN, "Not connected"),
    (ENOMEM, "Not enough memory"),
    (ENOTSUP, "Not supported"),
    (ECANCELED, "Operation canceled"),
    (EINPROGRESS, "Operation in progress"),
    (EPERM, "Operation was not permitted"),
    (EOWNERDEAD, "Owner dead"),
    (EACCES, "Permission denied"),
    (EPROTO, "Protocol error"),
    (EPROTONOSUPPORT, "Protocol not supported"),
    (EROFS, "Read only file system"),
    (EDEADLK, "Resource deadlock would occur"),
    (EAGAIN, "Resource unavailable try again"),
    (ERANGE, "Result out of range"),
    (ENOTRECOVERABLE, "State not recoverable"),
    (ETIME, "Stream timeout"),
    (ETXTBSY, "Text file busy"),
    (ETIMEDOUT, "Timed out"),
    (EMFILE, "Too many files open"),
    (ENFILE, "Too many files open in system"),
    (EMLINK, "Too many links"),
    (ELOOP, "Too many symbolic link levels"),
    (EOVERFLOW, "Value too large"),
    (EPROTOTYPE, "Wrong protocol type"),
];

/// Message for `errnum`, or [`UNKNOWN_ERROR`].
#[must_use]
pub fn strerror(errnum: i32) -> &'static str {
    MESSAGES
        .iter()
        .find(|(code, _)| *code == errnum)
        .map_or(UNKNOWN_ERROR, |(_, message)| message)
}
