//! String and memory operations.
//!
//! Implements `<string.h>` functions as safe Rust operating on slices.
//! `strerror` lives with the error numbers in [`crate::errno`]; `strcoll`
//! needs the diagnostic sink and is a [`crate::Runtime`] method.

pub mod mem;
pub mod str;
pub mod strtok;

pub use mem::{memchr, memcmp, memcpy, memmove, memrchr, memset};
pub use str::{
    strcat, strchr, strcmp, strcpy, strcspn, strlen, strncat, strncmp, strncpy, strnlen, strpbrk,
    strrchr, strspn, strstr, strxfrm,
};
pub use strtok::{TokenCursor, strtok, strtok_r};
