// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Error codes shared by the metal IRQ and I/O crates.
//!
//! Every fallible operation returns [`MResult`]. Callers that need the
//! C-style status integer (`0` on success, a negative errno on failure) get it
//! from [`MError::code`] or [`status`].

#![cfg_attr(not(test), no_std)]

use core::fmt;

use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// The error type used by the metal core.
///
/// Discriminants are the positive POSIX errno numbers; [`MError::code`]
/// negates them.
#[repr(i32)]
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, EnumCount, EnumIter)]
pub enum MError {
    /// Not enough space, e.g. every handler slot of a vector is taken (`ENOMEM`).
    NoMemory = 12,
    /// Invalid parameter/argument (`EINVAL`).
    InvalidInput = 22,
    /// Offset or length outside the addressed window (`ERANGE`).
    OutOfRange = 34,
}

impl MError {
    /// Returns the error description.
    pub const fn as_str(&self) -> &'static str {
        match *self {
            MError::NoMemory => "Out of memory",
            MError::InvalidInput => "Invalid input parameter",
            MError::OutOfRange => "Result out of range",
        }
    }

    /// Returns the positive errno number.
    pub const fn errno(self) -> i32 {
        self as i32
    }

    /// Returns the negative status code reported to C-style callers.
    pub const fn code(self) -> i32 {
        -(self as i32)
    }
}

impl TryFrom<i32> for MError {
    type Error = i32;

    /// Converts a negative status code back into an [`MError`].
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        MError::iter().find(|e| e.code() == value).ok_or(value)
    }
}

impl fmt::Display for MError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A specialized [`Result`] type with [`MError`] as the error type.
pub type MResult<T = ()> = Result<T, MError>;

/// Collapses a result into the integer status used on the C call surface.
pub fn status<T>(res: &MResult<T>) -> i32 {
    match res {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}

/// Constructs an [`MError`] while printing a warning message.
///
/// # Examples
///
/// ```
/// # use merrno::{m_err_type, MError};
/// assert_eq!(m_err_type!(NoMemory), MError::NoMemory);
/// assert_eq!(
///     m_err_type!(InvalidInput, "vector 300 out of range"),
///     MError::InvalidInput,
/// );
/// ```
#[macro_export]
macro_rules! m_err_type {
    ($err:ident) => {{
        let err = $crate::MError::$err;
        $crate::__priv::warn!("[{:?}]", err);
        err
    }};
    ($err:ident, $($arg:tt)+) => {{
        let err = $crate::MError::$err;
        $crate::__priv::warn!("[{:?}] {}", err, format_args!($($arg)+));
        err
    }};
}

/// Ensure a condition is true. If it is not, return from the function
/// with an error.
///
/// ```rust
/// # use merrno::{ensure, m_err, MResult};
/// fn check(vector: usize) -> MResult {
///     ensure!(vector < 32, m_err!(InvalidInput));
///     Ok(())
/// }
/// assert!(check(40).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($predicate:expr, $context_selector:expr $(,)?) => {
        if !$predicate {
            return $context_selector;
        }
    };
}

/// Constructs an [`Err(MError)`] while printing a warning message.
///
/// ```
/// # use merrno::{m_err, MError, MResult};
/// assert_eq!(m_err!(OutOfRange), MResult::<()>::Err(MError::OutOfRange));
/// ```
/// [`Err(MError)`]: Err
#[macro_export]
macro_rules! m_err {
    ($($t:tt)+) => {
        Err($crate::m_err_type!($($t)+))
    };
}

/// Returns an [`MError`] from the enclosing function, optionally with a
/// message.
#[macro_export]
macro_rules! m_bail {
    ($($t:tt)+) => {
        return $crate::m_err!($($t)+)
    };
}

#[doc(hidden)]
pub mod __priv {
    pub use log::warn;
}
