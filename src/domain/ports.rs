use crate::utils::error::Result;
use serde::Serialize;

/// 一個協定操作：由請求欄位解碼而成，執行後產生可序列化的結果
pub trait Operation {
    /// Tag carried in the request's `operation` field.
    const NAME: &'static str;

    type Output: Serialize;

    fn execute(self) -> Result<Self::Output>;
}
