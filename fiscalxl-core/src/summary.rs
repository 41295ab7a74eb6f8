//! Totals shown on the dashboard cards.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::record::LineItem;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub items: usize,
    /// Distinct (source file, invoice number) pairs.
    pub documents: usize,
    pub base_total: Decimal,
    pub ibs_total: Decimal,
    pub cbs_total: Decimal,
    /// `ibs_total + cbs_total`.
    pub tax_total: Decimal,
}

impl Summary {
    /// Sum a record set. Absent amounts add nothing.
    pub fn of(records: &[LineItem]) -> Self {
        let mut documents = HashSet::new();
        let mut summary = Summary { items: records.len(), ..Default::default() };

        for record in records {
            documents.insert((record.source_file.as_str(), record.invoice_number.as_deref()));
            summary.base_total += record.base_value.unwrap_or_default();
            summary.ibs_total += record.ibs_value.unwrap_or_default();
            summary.cbs_total += record.cbs_value.unwrap_or_default();
        }

        summary.documents = documents.len();
        summary.tax_total = summary.ibs_total + summary.cbs_total;
        summary
    }
}

pub fn summarize(records: &[LineItem]) -> Summary {
    Summary::of(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn totals() {
        let records = vec![
            LineItem {
                source_file: "a.xml".into(),
                invoice_number: Some("1".into()),
                base_value: Some(dec!(100.00)),
                ibs_value: Some(dec!(0.10)),
                cbs_value: Some(dec!(0.90)),
                ..Default::default()
            },
            LineItem {
                source_file: "a.xml".into(),
                invoice_number: Some("1".into()),
                base_value: Some(dec!(50)),
                ibs_value: Some(dec!(-0.05)),
                ..Default::default()
            },
            LineItem { source_file: "b.xml".into(), ..Default::default() },
        ];
        let summary = summarize(&records);
        assert_eq!(summary.items, 3);
        assert_eq!(summary.documents, 2);
        assert_eq!(summary.base_total, dec!(150.00));
        assert_eq!(summary.ibs_total, dec!(0.05));
        assert_eq!(summary.cbs_total, dec!(0.90));
        assert_eq!(summary.tax_total, dec!(0.95));
    }

    #[test]
    fn empty() {
        assert_eq!(Summary::of(&[]), Summary::default());
    }
}
