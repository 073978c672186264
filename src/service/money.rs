use bigdecimal::{BigDecimal, Zero};
use num_bigint::BigInt;

use crate::error::DocumentError;
use crate::models::invoice::NewInvoice;
use crate::models::item::NewInvoiceItem;

/// 发票头的本币金额
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseTotals {
    pub sub_total: BigDecimal,
    pub discount_val: BigDecimal,
    pub tax: BigDecimal,
    pub total: BigDecimal,
}

/// 明细行的本币金额
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemBase {
    pub price: BigDecimal,
    pub discount_val: BigDecimal,
    pub tax: BigDecimal,
    pub total: BigDecimal,
}

/// 按创建时冻结的汇率换算本币金额, 四舍五入 (round-half-up) 到币种精度
///
/// 纯函数: 相同输入恒得相同输出; 金额或汇率为负时返回 InvalidAmount。
pub fn to_base(
    amount: &BigDecimal,
    rate: &BigDecimal,
    precision: i64,
) -> Result<BigDecimal, DocumentError> {
    if amount < &BigDecimal::zero() {
        return Err(DocumentError::InvalidAmount(format!(
            "negative amount: {amount}"
        )));
    }
    if rate <= &BigDecimal::zero() {
        return Err(DocumentError::InvalidAmount(format!(
            "exchange rate must be positive, got {rate}"
        )));
    }

    Ok(round_half_up(&(amount * rate), precision))
}

/// 非负数值的 round-half-up: 加上保留位的半个单位后截断
fn round_half_up(value: &BigDecimal, scale: i64) -> BigDecimal {
    let half = BigDecimal::new(BigInt::from(5), scale + 1);
    (value + half).with_scale(scale)
}

/// 计算发票头的全部本币字段
pub fn base_totals(
    payload: &NewInvoice,
    precision: i64,
) -> Result<BaseTotals, DocumentError> {
    let rate = &payload.exchange_rate;
    Ok(BaseTotals {
        sub_total: to_base(&payload.sub_total, rate, precision)?,
        discount_val: to_base(&payload.discount_val, rate, precision)?,
        tax: to_base(&payload.tax, rate, precision)?,
        total: to_base(&payload.total, rate, precision)?,
    })
}

/// 计算明细行的全部本币字段
pub fn item_base(
    item: &NewInvoiceItem,
    rate: &BigDecimal,
    precision: i64,
) -> Result<ItemBase, DocumentError> {
    Ok(ItemBase {
        price: to_base(&item.price, rate, precision)?,
        discount_val: to_base(&item.discount_val, rate, precision)?,
        tax: to_base(&item.tax, rate, precision)?,
        total: to_base(&item.total, rate, precision)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn identity_rate_preserves_amount() {
        let amount = dec("123.45");
        assert_eq!(to_base(&amount, &dec("1"), 2).unwrap(), amount);
    }

    #[test]
    fn conversion_is_deterministic() {
        let a = to_base(&dec("99.99"), &dec("7.1315"), 2).unwrap();
        let b = to_base(&dec("99.99"), &dec("7.1315"), 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rounds_half_up_at_currency_precision() {
        // 0.125 恰在中点, half-up 进位
        assert_eq!(to_base(&dec("0.125"), &dec("1"), 2).unwrap(), dec("0.13"));
        assert_eq!(to_base(&dec("1.004"), &dec("1"), 2).unwrap(), dec("1.00"));
        assert_eq!(to_base(&dec("100"), &dec("1.23456"), 2).unwrap(), dec("123.46"));
        // 零小数位币种 (如 JPY)
        assert_eq!(to_base(&dec("10.5"), &dec("1"), 0).unwrap(), dec("11"));
    }

    #[test]
    fn negative_amount_is_rejected() {
        assert!(matches!(
            to_base(&dec("-1"), &dec("1"), 2),
            Err(DocumentError::InvalidAmount(_))
        ));
    }

    #[test]
    fn non_positive_rate_is_rejected() {
        assert!(matches!(
            to_base(&dec("1"), &dec("0"), 2),
            Err(DocumentError::InvalidAmount(_))
        ));
        assert!(matches!(
            to_base(&dec("1"), &dec("-2"), 2),
            Err(DocumentError::InvalidAmount(_))
        ));
    }
}
