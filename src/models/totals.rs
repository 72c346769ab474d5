use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

/// 单行计算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineAmount {
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub amount: BigDecimal, // = quantity × unit_price
}

/// 合计 (小计 / 消费税 / 含税合计)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub total: BigDecimal,
}

impl Totals {
    pub fn zero() -> Self {
        Self {
            subtotal: BigDecimal::zero(),
            tax: BigDecimal::zero(),
            total: BigDecimal::zero(),
        }
    }
}

impl Default for Totals {
    fn default() -> Self {
        Self::zero()
    }
}

/// 计算器输出: 行顺序与输入一致
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub lines: Vec<LineAmount>,
    pub totals: Totals,
}
