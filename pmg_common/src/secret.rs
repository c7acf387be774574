use std::{
    fmt,
    fmt::{Debug, Display},
};

use sqlx::{
    database::{HasArguments, HasValueRef},
    encode::IsNull,
    error::BoxDynError,
    Database,
    Decode,
    Encode,
    Type,
};

/// A value that must never end up in logs or API responses, such as a merchant's secret key.
///
/// `Debug` and `Display` both print `****`. The only way to get at the value is [`Secret::reveal`].
/// Secrets are stored in the database as their underlying type.
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T, DB> Type<DB> for Secret<T>
where
    T: Type<DB> + Clone + Default,
    DB: Database,
{
    fn type_info() -> DB::TypeInfo {
        T::type_info()
    }

    fn compatible(ty: &DB::TypeInfo) -> bool {
        T::compatible(ty)
    }
}

impl<'r, T, DB> Decode<'r, DB> for Secret<T>
where
    T: Decode<'r, DB> + Clone + Default,
    DB: Database,
{
    fn decode(value: <DB as HasValueRef<'r>>::ValueRef) -> Result<Self, BoxDynError> {
        T::decode(value).map(Self::new)
    }
}

impl<'q, T, DB> Encode<'q, DB> for Secret<T>
where
    T: Encode<'q, DB> + Clone + Default,
    DB: Database,
{
    fn encode_by_ref(&self, buf: &mut <DB as HasArguments<'q>>::ArgumentBuffer) -> IsNull {
        self.value.encode_by_ref(buf)
    }
}
