use crate::models::{Calculation, LineAmount, LineItem, Totals};
use bigdecimal::{BigDecimal, Zero};

/// 消费税率 (%)
pub const TAX_RATE_PERCENT: i64 = 10;

/// 计算明细金额与合计
///
/// 纯函数: 金额 = 数量 × 单价, 小计 = Σ金额, 税 = floor(小计 × 10%), 合计 = 小计 + 税。
/// 非数字输入按 0 处理, 负数照常参与计算。
pub fn calculate(items: &[LineItem]) -> Calculation {
    let lines: Vec<LineAmount> = items
        .iter()
        .map(|item| {
            let quantity = item.quantity.to_decimal();
            let unit_price = item.unit_price.to_decimal();
            let amount = &quantity * &unit_price;
            LineAmount {
                quantity,
                unit_price,
                amount,
            }
        })
        .collect();

    let subtotal = lines
        .iter()
        .fold(BigDecimal::zero(), |acc, line| acc + &line.amount);

    Calculation {
        lines,
        totals: totals_for(subtotal),
    }
}

/// 由小计推出税额与合计
pub fn totals_for(subtotal: BigDecimal) -> Totals {
    let tax = consumption_tax(&subtotal);
    let total = &subtotal + &tax;
    Totals {
        subtotal,
        tax,
        total,
    }
}

/// 消费税: 向下取整 (不是四舍五入)
pub fn consumption_tax(subtotal: &BigDecimal) -> BigDecimal {
    let raw = subtotal * BigDecimal::from(TAX_RATE_PERCENT) / BigDecimal::from(100);
    floor_whole(&raw)
}

/// 向负无穷取整到整数单位
pub fn floor_whole(value: &BigDecimal) -> BigDecimal {
    // with_scale 截断方向是朝 0
    let truncated = value.with_scale(0);
    if &truncated > value {
        truncated - BigDecimal::from(1)
    } else {
        truncated
    }
}
