use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 默认单位
pub const DEFAULT_UNIT: &str = "個";

/// 数量/单价的原始输入 (表单传来的可能是数字, 也可能是字符串)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(serde_json::Number),
    Text(String),
    Other(serde_json::Value),
}

impl Default for NumericInput {
    fn default() -> Self {
        NumericInput::Text(String::new())
    }
}

impl NumericInput {
    /// 转换为十进制数, 无法解析时为 0 (永不失败)
    pub fn to_decimal(&self) -> BigDecimal {
        match self {
            NumericInput::Number(n) => parse_numeric(&n.to_string()),
            NumericInput::Text(s) => parse_numeric(s),
            NumericInput::Other(_) => BigDecimal::zero(),
        }
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

impl From<i64> for NumericInput {
    fn from(value: i64) -> Self {
        NumericInput::Number(value.into())
    }
}

/// 明细行
///
/// 金额不在这里保存: 永远由 `quantity × unit_price` 重新计算。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_code: Option<String>,
    #[serde(default)]
    pub quantity: NumericInput,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub unit_price: NumericInput,
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

impl LineItem {
    pub fn new(
        product_name: impl Into<String>,
        quantity: impl Into<NumericInput>,
        unit_price: impl Into<NumericInput>,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            product_code: None,
            quantity: quantity.into(),
            unit: default_unit(),
            unit_price: unit_price.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.product_code = Some(code.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// 显示用单位: 空白时回落到默认单位
    pub fn display_unit(&self) -> &str {
        if self.unit.trim().is_empty() {
            DEFAULT_UNIT
        } else {
            &self.unit
        }
    }
}

/// 有效数字位数上限
pub const MAX_NUMERIC_DIGITS: usize = 30;

/// 指数绝对值上限
pub const MAX_NUMERIC_EXPONENT: i64 = 20;

/// 按前缀解析数字 (与表单端的 parseFloat 行为一致)
///
/// "12abc" -> 12, "abc" -> 0, "" -> 0, " -3.5e2" -> -350。
/// 位数或指数超出上限时按 0 处理, 避免生成超大的十进制数。
pub fn parse_numeric(input: &str) -> BigDecimal {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        // "5." 这种只有小数点的写法只取整数部分
        end = if frac_end > frac_start { frac_end } else { end };
    }

    if digits == 0 || digits > MAX_NUMERIC_DIGITS {
        return BigDecimal::zero();
    }

    // 指数部分必须完整才接受
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            let in_range = s[end + 1..exp_end]
                .parse::<i64>()
                .map(|exp| exp.abs() <= MAX_NUMERIC_EXPONENT)
                .unwrap_or(false);
            if !in_range {
                return BigDecimal::zero();
            }
            end = exp_end;
        }
    }

    let mut literal = s[..end].to_string();
    if literal.starts_with('.') || literal.starts_with("-.") || literal.starts_with("+.") {
        literal = literal.replacen('.', "0.", 1);
    }
    BigDecimal::from_str(&literal).unwrap_or_else(|_| BigDecimal::zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_numeric_plain() {
        assert_eq!(parse_numeric("10"), dec("10"));
        assert_eq!(parse_numeric("12.5"), dec("12.5"));
        assert_eq!(parse_numeric("  -3"), dec("-3"));
        assert_eq!(parse_numeric(".5"), dec("0.5"));
    }

    #[test]
    fn test_parse_numeric_prefix_and_garbage() {
        assert_eq!(parse_numeric(""), BigDecimal::zero());
        assert_eq!(parse_numeric("abc"), BigDecimal::zero());
        assert_eq!(parse_numeric("12abc"), dec("12"));
        assert_eq!(parse_numeric("5."), dec("5"));
        assert_eq!(parse_numeric("-"), BigDecimal::zero());
        assert_eq!(parse_numeric("1,000"), dec("1"));
    }

    #[test]
    fn test_parse_numeric_exponent() {
        assert_eq!(parse_numeric("1e3"), dec("1000"));
        assert_eq!(parse_numeric("2.5E-1"), dec("0.25"));
        assert_eq!(parse_numeric("7e"), dec("7"));
        assert_eq!(parse_numeric("1e+20"), dec("100000000000000000000"));
    }

    #[test]
    fn test_parse_numeric_out_of_range_is_zero() {
        assert_eq!(parse_numeric("1e2000000"), BigDecimal::zero());
        assert_eq!(parse_numeric("1e-21"), BigDecimal::zero());
        assert_eq!(parse_numeric("5e99999999999999999999"), BigDecimal::zero());
        assert_eq!(parse_numeric(&"9".repeat(MAX_NUMERIC_DIGITS + 1)), BigDecimal::zero());
        assert_eq!(
            parse_numeric(&format!("0.{}", "0".repeat(200_000))),
            BigDecimal::zero()
        );
        assert_eq!(parse_numeric(&"9".repeat(MAX_NUMERIC_DIGITS)), dec(&"9".repeat(MAX_NUMERIC_DIGITS)));
    }

    #[test]
    fn test_line_item_accepts_numbers_and_strings() {
        let item: LineItem = serde_json::from_value(serde_json::json!({
            "productName": "Widget",
            "quantity": 10,
            "unitPrice": "500"
        }))
        .unwrap();
        assert_eq!(item.quantity.to_decimal(), dec("10"));
        assert_eq!(item.unit_price.to_decimal(), dec("500"));
        assert_eq!(item.unit, DEFAULT_UNIT);
    }

    #[test]
    fn test_line_item_odd_values_become_zero() {
        let item: LineItem = serde_json::from_value(serde_json::json!({
            "productName": "X",
            "quantity": null,
            "unitPrice": true
        }))
        .unwrap();
        assert_eq!(item.quantity.to_decimal(), BigDecimal::zero());
        assert_eq!(item.unit_price.to_decimal(), BigDecimal::zero());
    }
}
