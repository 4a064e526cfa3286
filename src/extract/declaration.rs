use crate::extract::rule::ColumnSelection;
use crate::extract::rule::EmptyRows;
use crate::extract::rule::ExtractionRule;
use crate::extract::rule::SheetChoice;

/// Declaration columns, selected by header label.
pub const COLUMNS: [&str; 11] = [
    "Item", "Ordered Qty", "中文品名", "HS", "mag", "是否含电池",
    "鉴定证书编号", "证书类型", "DG", "BOL", "申报要素",
];

pub fn columns() -> Vec<String> {
    COLUMNS.iter().map(|column| column.to_string()).collect()
}

/// Declarations: the first sheet with its header in row 1, all rows kept.
pub(crate) fn rule() -> ExtractionRule {
    ExtractionRule {
        kind: "declaration",
        pattern: "*随附文件.xlsx",
        data_sheet: SheetChoice::First,
        header_sheet: SheetChoice::First,
        columns: ColumnSelection::Labels { header_row: 1, labels: &COLUMNS },
        data_row: 2,
        truncate: None,
        empty_rows: EmptyRows::Keep,
        key: None,
        lead_row: None,
        output_columns: columns(),
    }
}
