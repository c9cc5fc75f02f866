//! Types assigned to lowered statements.

use bon::bon;
use tessera_dtype::DType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IetConfig {
    /// Type of statements computing values.
    pub default_dtype: DType,
    /// Type of statements computing indices, and of loop counter proxies.
    pub index_dtype: DType,
}

impl Default for IetConfig {
    fn default() -> Self {
        Self { default_dtype: DType::Float32, index_dtype: DType::Int32 }
    }
}

#[bon]
impl IetConfig {
    #[builder]
    pub fn new(
        #[builder(default = DType::Float32)] default_dtype: DType,
        #[builder(default = DType::Int32)] index_dtype: DType,
    ) -> Self {
        Self { default_dtype, index_dtype }
    }
}
