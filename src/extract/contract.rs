use crate::table::Table;
use crate::table::Value;

/// Contract columns in output order.
pub const COLUMNS: [&str; 6] = ["品名", "料号", "单位", "数量", "单价(USD)", "总额(USD)"];

/// Invoice columns feeding the contract, paired with their contract names.
const SELECTION: [(&str, &str); 5] = [
    ("P/N", "品名"),
    ("NAME", "料号"),
    ("Q'TY (SET)", "数量"),
    ("U/P (USD)", "单价(USD)"),
    ("AMOUNT (USD)", "总额(USD)"),
];

/// Derives the contract table from the invoice table, one record per invoice record.
pub fn build_contract(invoices: &Table) -> Table {
    let mut contract = invoices.select(&SELECTION);
    contract.insert_column(2, "单位", Value::Empty);
    contract
}
