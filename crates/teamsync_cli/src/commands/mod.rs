pub(crate) mod meta;

#[cfg(feature = "github")]
pub(crate) mod shared;

#[cfg(feature = "github")]
pub(crate) mod assign;

#[cfg(feature = "github")]
pub(crate) mod permissions;
