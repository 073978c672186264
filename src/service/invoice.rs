use harsh::Harsh;
use sqlx::PgPool;

use crate::config::InvoiceConfig;
use crate::db::{queries, queries_audit, sequence};
use crate::error::DocumentError;
use crate::models::audit::PaidTransition;
use crate::models::invoice::{Invoice, InvoiceStatus, NewInvoice, PaidStatus};
use crate::service::money;

/// 币种精度缺省值 (大多数币种两位小数)
const DEFAULT_CURRENCY_PRECISION: i64 = 2;

/// 发票装配与状态变更服务
///
/// 创建流程的全部写入在一个事务内完成: 任一步失败整体回滚,
/// 不会留下无主明细/税费, 也不会留下已消耗却无发票的序号。
pub struct InvoiceService {
    pool: PgPool,
    hashids: Harsh,
}

/// 构建公开标识编码器 (Hashids, salt 来自配置)
pub fn build_hashids(salt: &str) -> Result<Harsh, DocumentError> {
    Harsh::builder()
        .salt(salt)
        .length(10)
        .build()
        .map_err(|e| DocumentError::Config(format!("hashids: {e}")))
}

/// 由公司全局序号生成单号
pub fn format_invoice_number(sequence_number: i64) -> String {
    format!("INV-{:06}", sequence_number)
}

/// 落库前校验: 汇率为正, 所有金额/数量非负; 违例在任何写入前拒绝
pub fn validate_payload(payload: &NewInvoice) -> Result<(), DocumentError> {
    use bigdecimal::{BigDecimal, Zero};
    let zero = BigDecimal::zero();

    if payload.exchange_rate <= zero {
        return Err(DocumentError::InvalidAmount("exchange_rate".into()));
    }

    let non_negative = |value: &BigDecimal, field: &str| -> Result<(), DocumentError> {
        if value < &zero {
            return Err(DocumentError::InvalidAmount(field.to_string()));
        }
        Ok(())
    };

    non_negative(&payload.sub_total, "sub_total")?;
    non_negative(&payload.discount_val, "discount_val")?;
    non_negative(&payload.tax, "tax")?;
    non_negative(&payload.total, "total")?;

    for (idx, item) in payload.items.iter().enumerate() {
        non_negative(&item.quantity, &format!("items[{idx}].quantity"))?;
        non_negative(&item.price, &format!("items[{idx}].price"))?;
        non_negative(&item.discount_val, &format!("items[{idx}].discount_val"))?;
        non_negative(&item.tax, &format!("items[{idx}].tax"))?;
        non_negative(&item.total, &format!("items[{idx}].total"))?;
        for (tax_idx, tax) in item.taxes.iter().enumerate() {
            if let Some(amount) = &tax.amount {
                non_negative(amount, &format!("items[{idx}].taxes[{tax_idx}].amount"))?;
            }
        }
    }

    for (idx, tax) in payload.taxes.iter().enumerate() {
        if let Some(amount) = &tax.amount {
            non_negative(amount, &format!("taxes[{idx}].amount"))?;
        }
    }

    Ok(())
}

impl InvoiceService {
    pub fn new(pool: PgPool, config: &InvoiceConfig) -> Result<Self, DocumentError> {
        Ok(Self {
            pool,
            hashids: build_hashids(&config.hashid_salt)?,
        })
    }

    /// 由内部 id 派生不可猜测的公开标识
    pub fn public_hash(&self, invoice_id: i64) -> String {
        self.hashids.encode(&[invoice_id as u64])
    }

    /// 创建发票聚合: 主表、序号、明细、税费、自定义字段、汇率快照, 单事务
    ///
    /// 非幂等: 相同载荷调用两次得到两张发票与两组序号。
    pub async fn create_invoice(&self, payload: NewInvoice) -> Result<Invoice, DocumentError> {
        validate_payload(&payload)?;

        let mut tx = self.pool.begin().await?;

        let precision = queries::currency_precision(&mut tx, payload.currency_id)
            .await?
            .map(i64::from)
            .unwrap_or(DEFAULT_CURRENCY_PRECISION);

        // 1. 主表: invoice_send 时初始状态为 SENT
        let status = if payload.invoice_send {
            InvoiceStatus::Sent
        } else {
            InvoiceStatus::Draft
        };
        let base = money::base_totals(&payload, precision)?;
        let invoice_id = queries::insert_invoice(&mut tx, &payload, status.as_str(), &base).await?;

        // 2. 序号 + 公开标识
        let numbers =
            sequence::allocate_pair(&mut tx, payload.company_id, payload.customer_id).await?;
        let invoice_number = format_invoice_number(numbers.sequence_number);
        let unique_hash = self.public_hash(invoice_id);
        queries::update_invoice_numbers(
            &mut tx,
            invoice_id,
            numbers.sequence_number,
            numbers.customer_sequence_number,
            &invoice_number,
            &unique_hash,
        )
        .await?;

        // 3. 明细与明细级税费/自定义字段
        for item in &payload.items {
            let item_base = money::item_base(item, &payload.exchange_rate, precision)?;
            let item_id = queries::insert_item(
                &mut tx,
                invoice_id,
                payload.company_id,
                item,
                &payload.exchange_rate,
                &item_base,
            )
            .await?;

            for tax in &item.taxes {
                // amount 为空的税费条目跳过
                let Some(amount) = &tax.amount else { continue };
                let base_amount = money::to_base(amount, &payload.exchange_rate, precision)?;
                queries::insert_tax(
                    &mut tx,
                    payload.company_id,
                    None,
                    Some(item_id),
                    tax,
                    amount,
                    &base_amount,
                    payload.currency_id,
                    &payload.exchange_rate,
                )
                .await?;
            }

            for field in &item.custom_fields {
                queries::insert_custom_field_value(
                    &mut tx,
                    payload.company_id,
                    "InvoiceItem",
                    item_id,
                    &field.name,
                    field.value.as_deref(),
                )
                .await?;
            }
        }

        // 4. 发票币种与公司基准币种不同时记录汇率快照
        let base_currency = queries::company_currency_setting(&mut tx, payload.company_id).await?;
        if base_currency.as_deref() != Some(payload.currency_id.to_string().as_str()) {
            queries::insert_exchange_rate_log(
                &mut tx,
                payload.company_id,
                payload.currency_id,
                &payload.exchange_rate,
            )
            .await?;
        }

        // 5. 发票级税费 (同样跳过空金额)
        for tax in &payload.taxes {
            let Some(amount) = &tax.amount else { continue };
            let base_amount = money::to_base(amount, &payload.exchange_rate, precision)?;
            queries::insert_tax(
                &mut tx,
                payload.company_id,
                Some(invoice_id),
                None,
                tax,
                amount,
                &base_amount,
                payload.currency_id,
                &payload.exchange_rate,
            )
            .await?;
        }

        // 6. 发票级自定义字段
        for field in &payload.custom_fields {
            queries::insert_custom_field_value(
                &mut tx,
                payload.company_id,
                "Invoice",
                invoice_id,
                &field.name,
                field.value.as_deref(),
            )
            .await?;
        }

        tx.commit().await?;
        tracing::info!(
            "发票 {} 创建完成, 单号 {}, 明细 {} 条",
            invoice_id,
            invoice_number,
            payload.items.len()
        );

        // 7. 重新加载完整聚合返回
        queries::load_invoice(&self.pool, invoice_id).await
    }

    /// 更新付款状态, 真实迁移时在同一事务内追加审计记录
    ///
    /// actor 由调用方显式传入; 系统触发的变更传 None。
    /// 返回是否写入了审计记录。
    pub async fn update_paid_status(
        &self,
        invoice_id: i64,
        new_status: PaidStatus,
        actor: Option<i64>,
    ) -> Result<bool, DocumentError> {
        let mut tx = self.pool.begin().await?;

        // FOR UPDATE 读出"前一个已持久化状态", 并发更新在此串行化
        let old_raw = queries::lock_paid_status(&mut tx, invoice_id)
            .await?
            .ok_or(DocumentError::NotFound)?;
        let old_status: PaidStatus = old_raw
            .parse()
            .map_err(|e: String| DocumentError::Persistence(sqlx::Error::Decode(e.into())))?;

        queries::set_paid_status(&mut tx, invoice_id, new_status.as_str()).await?;

        let recorded = match PaidTransition::genuine(invoice_id, actor, old_status, new_status) {
            Some(transition) => {
                queries_audit::insert_paid_audit_log(&mut tx, &transition).await?;
                true
            }
            None => false,
        };

        tx.commit().await?;

        if recorded {
            tracing::info!(
                "发票 {} 付款状态 {} -> {}, 已记录审计",
                invoice_id,
                old_raw,
                new_status.as_str()
            );
        }

        Ok(recorded)
    }

    /// 归档开关: 归档时暂存当前状态, 恢复时回填; paid_status 正交不受影响
    pub async fn toggle_archive(&self, invoice_id: i64) -> Result<Invoice, DocumentError> {
        let mut tx = self.pool.begin().await?;

        let (is_archived, status, previous_status) =
            queries::lock_archive_state(&mut tx, invoice_id)
                .await?
                .ok_or(DocumentError::NotFound)?;

        if is_archived {
            let restored = previous_status
                .unwrap_or_else(|| InvoiceStatus::Draft.as_str().to_string());
            queries::set_archive_state(&mut tx, invoice_id, false, &restored, None).await?;
        } else {
            queries::set_archive_state(
                &mut tx,
                invoice_id,
                true,
                InvoiceStatus::Archived.as_str(),
                Some(&status),
            )
            .await?;
        }

        tx.commit().await?;
        queries::load_invoice(&self.pool, invoice_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::NewTax;
    use crate::models::item::NewInvoiceItem;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn sample_payload() -> NewInvoice {
        NewInvoice {
            company_id: 1,
            customer_id: 2,
            currency_id: 3,
            invoice_date: chrono::NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            due_date: None,
            reference_number: None,
            exchange_rate: dec("1"),
            sub_total: dec("100"),
            discount_type: None,
            discount_val: dec("0"),
            tax: dec("10"),
            total: dec("110"),
            notes: None,
            items: vec![NewInvoiceItem {
                name: "Consulting".into(),
                description: None,
                quantity: dec("1"),
                unit_name: None,
                price: dec("100"),
                discount_type: None,
                discount_val: dec("0"),
                tax: dec("10"),
                total: dec("110"),
                taxes: vec![],
                custom_fields: vec![],
            }],
            taxes: vec![],
            custom_fields: vec![],
            invoice_send: false,
        }
    }

    #[test]
    fn valid_payload_passes() {
        assert!(validate_payload(&sample_payload()).is_ok());
    }

    #[test]
    fn negative_item_price_is_rejected_before_any_write() {
        let mut payload = sample_payload();
        payload.items[0].price = dec("-5");
        match validate_payload(&payload) {
            Err(DocumentError::InvalidAmount(field)) => assert_eq!(field, "items[0].price"),
            other => panic!("expected InvalidAmount, got {other:?}"),
        }
    }

    #[test]
    fn zero_exchange_rate_is_rejected() {
        let mut payload = sample_payload();
        payload.exchange_rate = dec("0");
        assert!(matches!(
            validate_payload(&payload),
            Err(DocumentError::InvalidAmount(_))
        ));
    }

    #[test]
    fn absent_tax_amount_is_not_an_error() {
        let mut payload = sample_payload();
        payload.taxes.push(NewTax {
            tax_type_id: None,
            name: "VAT".into(),
            percent: Some(dec("19")),
            amount: None,
        });
        assert!(validate_payload(&payload).is_ok());
    }

    #[test]
    fn invoice_number_is_zero_padded() {
        assert_eq!(format_invoice_number(7), "INV-000007");
        assert_eq!(format_invoice_number(123456), "INV-123456");
        assert_eq!(format_invoice_number(1234567), "INV-1234567");
    }

    #[test]
    fn public_hash_is_deterministic_and_opaque() {
        let hashids = build_hashids("test-salt").unwrap();
        let a = hashids.encode(&[42]);
        let b = hashids.encode(&[42]);
        assert_eq!(a, b);
        assert!(a.len() >= 10);
        // 可逆解码回内部 id
        assert_eq!(hashids.decode(&a).unwrap(), vec![42]);
    }

    #[test]
    fn different_salts_produce_different_hashes() {
        let a = build_hashids("salt-a").unwrap().encode(&[42]);
        let b = build_hashids("salt-b").unwrap().encode(&[42]);
        assert_ne!(a, b);
    }
}
