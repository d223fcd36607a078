use std::collections::BTreeSet;

use crate::record::{fields, CellValue};

/// A text column stored as codes into a sorted, closed set of categories
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalColumn {
    categories: Vec<String>,
    codes: Vec<Option<u32>>,
}

impl CategoricalColumn {
    pub fn from_values(values: &[CellValue]) -> Self {
        let categories: Vec<String> = values
            .iter()
            .filter(|v| !v.is_absent())
            .map(|v| v.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let codes = values
            .iter()
            .map(|v| {
                if v.is_absent() {
                    return None;
                }
                categories
                    .binary_search(&v.to_string())
                    .ok()
                    .map(|idx| idx as u32)
            })
            .collect();

        Self { categories, codes }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn codes(&self) -> &[Option<u32>] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&str> {
        let code = (*self.codes.get(row)?)?;
        self.categories.get(code as usize).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableColumn {
    Categorical(CategoricalColumn),
    Values(Vec<CellValue>),
}

impl TableColumn {
    pub fn len(&self) -> usize {
        match self {
            TableColumn::Categorical(c) => c.len(),
            TableColumn::Values(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decoded cell value
    pub fn value(&self, row: usize) -> Option<CellValue> {
        match self {
            TableColumn::Categorical(c) => {
                if row >= c.len() {
                    return None;
                }
                Some(
                    c.get(row)
                        .map(|s| CellValue::Text(s.to_string()))
                        .unwrap_or(CellValue::Absent),
                )
            }
            TableColumn::Values(v) => v.get(row).cloned(),
        }
    }
}

/// The finished unified table: union of all experiments' fields, with
/// PROTEIN, ORGANISM, METHOD, PAPER and `subgroup` interned
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedTable {
    columns: Vec<(String, TableColumn)>,
    rows: usize,
}

impl UnifiedTable {
    pub(crate) fn build(columns: Vec<(String, Vec<CellValue>)>, rows: usize) -> Self {
        let subgroups = subgroup_keys(&columns, rows);

        let mut table: Vec<(String, TableColumn)> = columns
            .into_iter()
            .map(|(name, values)| {
                let column = if fields::CATEGORICAL.contains(&name.as_str()) {
                    TableColumn::Categorical(CategoricalColumn::from_values(&values))
                } else {
                    TableColumn::Values(values)
                };
                (name, column)
            })
            .collect();
        table.push((
            fields::SUBGROUP.to_string(),
            TableColumn::Categorical(CategoricalColumn::from_values(&subgroups)),
        ));

        Self {
            columns: table,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &TableColumn)> {
        self.columns.iter().map(|(name, col)| (name.as_str(), col))
    }

    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, col)| col)
    }

    pub fn value(&self, row: usize, name: &str) -> Option<CellValue> {
        self.column(name)?.value(row)
    }

    pub fn subgroup(&self, row: usize) -> Option<&str> {
        match self.column(fields::SUBGROUP)? {
            TableColumn::Categorical(c) => c.get(row),
            TableColumn::Values(_) => None,
        }
    }
}

/// `"{PAPER}+{ORGANISM}+{PROTEIN}"` per row
fn subgroup_keys(columns: &[(String, Vec<CellValue>)], rows: usize) -> Vec<CellValue> {
    let find = |name: &str| {
        columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    };
    let (paper, organism, protein) = (
        find(fields::PAPER),
        find(fields::ORGANISM),
        find(fields::PROTEIN),
    );

    let cell = |col: Option<&[CellValue]>, row: usize| {
        col.and_then(|c| c.get(row))
            .map(|v| v.to_string())
            .unwrap_or_default()
    };
    (0..rows)
        .map(|row| {
            CellValue::Text(format!(
                "{}+{}+{}",
                cell(paper, row),
                cell(organism, row),
                cell(protein, row)
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn sample_table() -> UnifiedTable {
        UnifiedTable::build(
            vec![
                (
                    fields::PAPER.to_string(),
                    vec![text("Tian_NAR_2015"), text("Kosuri_PNAS_2013"), text("Tian_NAR_2015")],
                ),
                (
                    fields::ORGANISM.to_string(),
                    vec![text("E. coli"), text("E. coli MG1655"), text("E. coli")],
                ),
                (
                    fields::PROTEIN.to_string(),
                    vec![text("RFP"), text("sfGFP"), text("GFP")],
                ),
                (
                    fields::RNA.to_string(),
                    vec![CellValue::Absent, CellValue::Number(1.5), CellValue::Absent],
                ),
            ],
            3,
        )
    }

    #[test]
    fn test_categories_sorted_and_coded() {
        let table = sample_table();
        match table.column(fields::PAPER).unwrap() {
            TableColumn::Categorical(c) => {
                assert_eq!(c.categories(), &["Kosuri_PNAS_2013", "Tian_NAR_2015"]);
                assert_eq!(c.codes(), &[Some(1), Some(0), Some(1)]);
            }
            other => panic!("expected categorical, got {:?}", other),
        }
        assert_eq!(table.value(1, fields::PAPER), Some(text("Kosuri_PNAS_2013")));
    }

    #[test]
    fn test_non_categorical_untouched() {
        let table = sample_table();
        assert!(matches!(
            table.column(fields::RNA),
            Some(TableColumn::Values(_))
        ));
        assert_eq!(table.value(0, fields::RNA), Some(CellValue::Absent));
        assert_eq!(table.value(1, fields::RNA), Some(CellValue::Number(1.5)));
        assert_eq!(table.value(5, fields::RNA), None);
    }

    #[test]
    fn test_subgroup_key() {
        let table = sample_table();
        assert_eq!(table.subgroup(0), Some("Tian_NAR_2015+E. coli+RFP"));
        assert_eq!(table.subgroup(1), Some("Kosuri_PNAS_2013+E. coli MG1655+sfGFP"));
        assert_eq!(table.column_names().last(), Some(&fields::SUBGROUP));
    }

    #[test]
    fn test_absent_categorical_cell() {
        let column = CategoricalColumn::from_values(&[text("b"), CellValue::Absent, text("a")]);
        assert_eq!(column.categories(), &["a", "b"]);
        assert_eq!(column.get(1), None);
        assert_eq!(column.get(2), Some("a"));
        assert_eq!(
            TableColumn::Categorical(column).value(1),
            Some(CellValue::Absent)
        );
    }

    #[test]
    fn test_empty_table() {
        let table = UnifiedTable::build(vec![], 0);
        assert!(table.is_empty());
        assert_eq!(table.column_names(), vec![fields::SUBGROUP]);
    }
}
