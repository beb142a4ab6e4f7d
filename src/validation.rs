// src/validation.rs
use serde::{Serialize, Serializer};
use validator::Validate;

use crate::AppError;

/// 已通过 validator 校验的请求体，只有它能被客户端发出去
pub struct ValidatedJson<'a, T>(&'a T);

impl<'a, T> ValidatedJson<'a, T>
where
    T: Validate + Serialize,
{
    pub fn new(value: &'a T) -> Result<Self, AppError> {
        // 校验失败通过 AppError::ValidationError 自动转换，不会发出请求
        value.validate()?;
        Ok(Self(value))
    }
}

impl<T: Serialize> Serialize for ValidatedJson<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
