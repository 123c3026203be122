use std::str::Lines;

pub const TAB: &str = "\t";

/// One line of delimited text. Missing trailing columns read as empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row<'a> {
    fields: Vec<&'a str>,
}

impl<'a> Row<'a> {
    pub fn field(&self, index: usize) -> &'a str {
        self.fields.get(index).copied().unwrap_or("")
    }
    
    pub fn len(&self) -> usize {
        self.fields.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
    
    pub fn fields(&self) -> &[&'a str] {
        &self.fields
    }
}

pub struct Rows<'a> {
    lines: Lines<'a>,
    separator: &'a str,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;
    
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                continue;
            }
            
            return Some(Row {
                fields: line.split(self.separator).collect(),
            });
        }
    }
}

/// Lazily splits `text` into rows of `separator`-delimited fields, skipping blank lines.
/// Leading whitespace of the first field is kept.
pub fn rows<'a>(text: &'a str, separator: &'a str) -> Rows<'a> {
    Rows {
        lines: text.lines(),
        separator,
    }
}

/// Splits a multi-valued tshark field (`a,b,c`) and returns the first value.
pub fn first_value(field: &str) -> &str {
    field.split(',').next().unwrap_or("").trim()
}
