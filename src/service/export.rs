use sqlx::PgPool;
use std::collections::HashMap;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::db::queries_export;
use crate::error::DocumentError;
use crate::models::export::{ExportFilter, ExportInvoiceRow, ExportItemRow, EXPORT_HEADERS};

/// 每页发票数上限, 峰值内存与导出总量无关
pub const PAGE_SIZE: i64 = 100;

/// 键集分页游标: id > last_id 升序取页, 返回行数不足一页即终止
///
/// 只读无锁, 可在任意页边界取消; 导出期间插入的更大 id 会被后续页带上
/// (最终一致, 非时点快照)。
#[derive(Debug, Clone)]
pub struct ExportCursor {
    filter: ExportFilter,
    last_id: i64,
    page_size: i64,
    done: bool,
}

impl ExportCursor {
    pub fn new(filter: ExportFilter) -> Self {
        Self {
            filter,
            last_id: 0,
            page_size: PAGE_SIZE,
            done: false,
        }
    }

    #[cfg(test)]
    fn with_page_size(filter: ExportFilter, page_size: i64) -> Self {
        Self {
            page_size,
            ..Self::new(filter)
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn last_id(&self) -> i64 {
        self.last_id
    }

    /// 取下一页并推进游标; 游标终止后恒返回空页
    pub async fn next_page(
        &mut self,
        pool: &PgPool,
    ) -> Result<Vec<ExportInvoiceRow>, sqlx::Error> {
        if self.done {
            return Ok(Vec::new());
        }

        let page =
            queries_export::fetch_invoice_page(pool, &self.filter, self.last_id, self.page_size)
                .await?;
        self.advance(page.len(), page.last().map(|row| row.id));
        Ok(page)
    }

    /// 推进逻辑与终止条件 (返回行数 < 页大小)
    fn advance(&mut self, returned: usize, max_id: Option<i64>) {
        if let Some(id) = max_id {
            self.last_id = id;
        }
        if (returned as i64) < self.page_size {
            self.done = true;
        }
    }
}

fn opt_str(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// 拍平为导出行: 每条明细一行, 无明细发票输出一行空明细列
pub fn invoice_rows(invoice: &ExportInvoiceRow, items: &[ExportItemRow]) -> Vec<Vec<String>> {
    let header_cols = |item_cols: [String; 10]| -> Vec<String> {
        let mut row = vec![
            invoice.id.to_string(),
            opt_str(&invoice.invoice_number),
            opt_str(&invoice.reference_number),
            invoice.invoice_date.to_string(),
            invoice.due_date.map(|d| d.to_string()).unwrap_or_default(),
            invoice.status.clone(),
            invoice.paid_status.clone(),
            invoice.sub_total.to_string(),
            invoice.discount_val.to_string(),
            opt_str(&invoice.discount_type),
            invoice.tax.to_string(),
            invoice.total.to_string(),
            invoice.due_amount.to_string(),
            opt_str(&invoice.notes),
            invoice.customer_id.map(|id| id.to_string()).unwrap_or_default(),
            opt_str(&invoice.customer_name),
            opt_str(&invoice.customer_email),
            opt_str(&invoice.customer_phone),
            opt_str(&invoice.customer_company),
            opt_str(&invoice.currency_code),
        ];
        row.extend(item_cols);
        row.push(invoice.created_at.to_rfc3339());
        row.push(invoice.updated_at.to_rfc3339());
        row
    };

    if items.is_empty() {
        return vec![header_cols(Default::default())];
    }

    items
        .iter()
        .map(|item| {
            header_cols([
                item.id.to_string(),
                item.name.clone(),
                opt_str(&item.description),
                item.quantity.to_string(),
                opt_str(&item.unit_name),
                item.price.to_string(),
                item.discount_val.to_string(),
                opt_str(&item.discount_type),
                item.tax.to_string(),
                item.total.to_string(),
            ])
        })
        .collect()
}

/// 流式 CSV 导出器
///
/// 逐页写入 sink, 不在内存物化完整结果集; 中途失败时已写出的行保持已交付。
pub struct CsvExporter {
    pool: PgPool,
}

impl CsvExporter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 导出匹配的发票, 返回数据行数 (不含列头)
    pub async fn export<W: AsyncWrite + Unpin + Send>(
        &self,
        filter: ExportFilter,
        sink: &mut W,
    ) -> Result<u64, DocumentError> {
        let mut cursor = ExportCursor::new(filter);
        let mut rows_written: u64 = 0;

        let header: Vec<String> = EXPORT_HEADERS.iter().map(|h| h.to_string()).collect();
        write_chunk(sink, &[header]).await?;

        while !cursor.is_done() {
            let page = cursor.next_page(&self.pool).await?;
            if page.is_empty() {
                break;
            }

            let ids: Vec<i64> = page.iter().map(|inv| inv.id).collect();
            let items = queries_export::fetch_items_for_invoices(&self.pool, &ids).await?;
            let mut by_invoice: HashMap<i64, Vec<ExportItemRow>> = HashMap::new();
            for item in items {
                by_invoice.entry(item.invoice_id).or_default().push(item);
            }

            let mut records = Vec::new();
            for invoice in &page {
                let item_rows = by_invoice.get(&invoice.id).map(Vec::as_slice).unwrap_or(&[]);
                records.extend(invoice_rows(invoice, item_rows));
            }

            rows_written += records.len() as u64;
            write_chunk(sink, &records).await?;
            tracing::debug!("导出进度: 游标 {}, 累计 {} 行", cursor.last_id(), rows_written);
        }

        sink.flush().await?;
        tracing::info!("CSV 导出完成, 共 {} 行", rows_written);
        Ok(rows_written)
    }
}

/// 把一批记录编码为 CSV 字节并写入 sink
async fn write_chunk<W: AsyncWrite + Unpin>(
    sink: &mut W,
    records: &[Vec<String>],
) -> Result<(), DocumentError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.write_record(record)?;
    }
    let buf = writer
        .into_inner()
        .map_err(|e| DocumentError::Io(e.into_error()))?;
    sink.write_all(&buf).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn sample_invoice(id: i64) -> ExportInvoiceRow {
        ExportInvoiceRow {
            id,
            invoice_number: Some(format!("INV-{:06}", id)),
            reference_number: None,
            invoice_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            due_date: Some(NaiveDate::from_ymd_opt(2026, 8, 31).unwrap()),
            status: "SENT".into(),
            paid_status: "UNPAID".into(),
            sub_total: dec("100"),
            discount_val: dec("0"),
            discount_type: None,
            tax: dec("10"),
            total: dec("110"),
            due_amount: dec("110"),
            notes: None,
            customer_id: Some(7),
            customer_name: Some("Acme".into()),
            customer_email: Some("billing@acme.test".into()),
            customer_phone: None,
            customer_company: Some("Acme Inc".into()),
            currency_code: Some("EUR".into()),
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap(),
        }
    }

    fn sample_item(id: i64, invoice_id: i64) -> ExportItemRow {
        ExportItemRow {
            id,
            invoice_id,
            name: "Widget".into(),
            description: None,
            quantity: dec("2"),
            unit_name: Some("pc".into()),
            price: dec("50"),
            discount_val: dec("0"),
            discount_type: None,
            tax: dec("10"),
            total: dec("110"),
        }
    }

    #[test]
    fn one_row_per_item() {
        let invoice = sample_invoice(1);
        let items = [sample_item(11, 1), sample_item(12, 1)];
        let rows = invoice_rows(&invoice, &items);
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.len(), EXPORT_HEADERS.len());
            assert_eq!(row[0], "1");
        }
        assert_eq!(rows[0][20], "11");
        assert_eq!(rows[1][20], "12");
    }

    #[test]
    fn empty_invoice_yields_single_row_with_blank_item_columns() {
        let invoice = sample_invoice(5);
        let rows = invoice_rows(&invoice, &[]);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.len(), EXPORT_HEADERS.len());
        // Item ID..Item Total (第 21-30 列) 全部留空
        assert!(row[20..30].iter().all(String::is_empty));
        // 头尾字段仍然齐全
        assert_eq!(row[0], "5");
        assert_eq!(row[19], "EUR");
        assert!(!row[30].is_empty());
    }

    #[test]
    fn cursor_advances_and_terminates_on_short_page() {
        let mut cursor = ExportCursor::with_page_size(ExportFilter::default(), 100);

        // 整页: 继续
        cursor.advance(100, Some(100));
        assert!(!cursor.is_done());
        assert_eq!(cursor.last_id(), 100);

        // 第二整页
        cursor.advance(100, Some(200));
        assert!(!cursor.is_done());

        // 不足一页: 终止 (250 张发票 => 3 页)
        cursor.advance(50, Some(250));
        assert!(cursor.is_done());
        assert_eq!(cursor.last_id(), 250);
    }

    #[test]
    fn cursor_terminates_on_empty_page_without_moving() {
        let mut cursor = ExportCursor::with_page_size(ExportFilter::default(), 100);
        cursor.advance(0, None);
        assert!(cursor.is_done());
        assert_eq!(cursor.last_id(), 0);
    }

    #[tokio::test]
    async fn chunks_stream_incrementally_into_the_sink() {
        let mut sink = std::io::Cursor::new(Vec::new());
        let header: Vec<String> = EXPORT_HEADERS.iter().map(|h| h.to_string()).collect();
        write_chunk(&mut sink, &[header]).await.unwrap();
        let after_header = sink.get_ref().len();
        assert!(after_header > 0);

        let rows = invoice_rows(&sample_invoice(1), &[sample_item(11, 1)]);
        write_chunk(&mut sink, &rows).await.unwrap();
        assert!(sink.get_ref().len() > after_header);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Invoice ID,Invoice Number"));
        assert!(lines.next().unwrap().starts_with("1,INV-000001"));
    }

    #[tokio::test]
    async fn sink_write_failure_surfaces_as_io_error() {
        // 固定容量的 sink 写满后 write_all 失败
        let mut space = [0u8; 4];
        let mut sink = std::io::Cursor::new(&mut space[..]);
        let header: Vec<String> = EXPORT_HEADERS.iter().map(|h| h.to_string()).collect();
        let err = write_chunk(&mut sink, &[header]).await.unwrap_err();
        assert!(matches!(err, DocumentError::Io(_)));
    }
}
