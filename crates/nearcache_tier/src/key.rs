// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

/// Canonical byte form of a cache key.
///
/// Membership filters hash this form, so the client and the server must agree on it. For
/// keys that travel over the wire this is the marshalled key; the implementations here use
/// UTF-8 for strings and big-endian for integers.
///
/// # Examples
///
/// ```
/// use nearcache_tier::KeyBytes;
///
/// assert_eq!(&*"abc".key_bytes(), b"abc");
/// assert_eq!(&*1u32.key_bytes(), &[0, 0, 0, 1]);
/// ```
pub trait KeyBytes {
    /// Returns the canonical bytes of this key.
    fn key_bytes(&self) -> Cow<'_, [u8]>;
}

impl KeyBytes for str {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl KeyBytes for String {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl KeyBytes for [u8] {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl KeyBytes for Vec<u8> {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl<T: KeyBytes + ?Sized> KeyBytes for &T {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        (**self).key_bytes()
    }
}

macro_rules! impl_key_bytes_for_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl KeyBytes for $ty {
                fn key_bytes(&self) -> Cow<'_, [u8]> {
                    Cow::Owned(self.to_be_bytes().to_vec())
                }
            }
        )*
    };
}

impl_key_bytes_for_int!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);
