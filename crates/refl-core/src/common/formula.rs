//! Chemical formula parsing (`H2O`, `C10H18NO8P`, `Ca(OH)2`, `D2O0.5`).

use super::constants::FM_TO_ANGSTROM;
use super::elements::ElementData;
use crate::domain::ReflError;
use num_complex::Complex64;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("chemical formula is empty")]
    Empty,
    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("unbalanced parenthesis at position {position}")]
    UnbalancedParenthesis { position: usize },
    #[error("invalid count '{text}' at position {position}")]
    InvalidCount { text: String, position: usize },
    #[error("unknown element '{symbol}'")]
    UnknownElement { symbol: String },
}

impl From<FormulaError> for ReflError {
    fn from(source: FormulaError) -> Self {
        ReflError::lookup("LOOKUP.CHEMICAL_FORMULA", source.to_string())
    }
}

/// Element counts in order of first appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct ChemicalFormula {
    counts: Vec<(String, f64)>,
}

impl ChemicalFormula {
    pub fn parse(text: &str) -> Result<Self, FormulaError> {
        let chars: Vec<char> = text.trim().chars().collect();
        if chars.is_empty() {
            return Err(FormulaError::Empty);
        }

        let mut parser = FormulaParser {
            chars: &chars,
            position: 0,
        };
        let counts = parser.parse_group(0)?;
        if parser.position != chars.len() {
            return Err(FormulaError::UnbalancedParenthesis {
                position: parser.position,
            });
        }
        Ok(Self { counts })
    }

    pub fn counts(&self) -> &[(String, f64)] {
        &self.counts
    }

    /// Summed scattering length in Å.
    pub fn scattering_length(&self, data: &dyn ElementData) -> Result<Complex64, FormulaError> {
        let mut total = Complex64::new(0.0, 0.0);
        for (symbol, count) in &self.counts {
            let length = data
                .scattering_length(symbol)
                .ok_or_else(|| FormulaError::UnknownElement {
                    symbol: symbol.clone(),
                })?;
            total += length * *count;
        }
        Ok(total * FM_TO_ANGSTROM)
    }

    /// Molecular weight in g/mol.
    pub fn molecular_weight(&self, data: &dyn ElementData) -> Result<f64, FormulaError> {
        self.counts.iter().try_fold(0.0, |total, (symbol, count)| {
            data.atomic_mass(symbol)
                .map(|mass| total + mass * count)
                .ok_or_else(|| FormulaError::UnknownElement {
                    symbol: symbol.clone(),
                })
        })
    }
}

struct FormulaParser<'a> {
    chars: &'a [char],
    position: usize,
}

impl FormulaParser<'_> {
    fn parse_group(&mut self, depth: usize) -> Result<Vec<(String, f64)>, FormulaError> {
        let mut counts: Vec<(String, f64)> = Vec::new();

        while let Some(&current) = self.chars.get(self.position) {
            match current {
                '(' => {
                    let open = self.position;
                    self.position += 1;
                    let inner = self.parse_group(depth + 1)?;
                    if self.chars.get(self.position) != Some(&')') {
                        return Err(FormulaError::UnbalancedParenthesis { position: open });
                    }
                    self.position += 1;
                    let multiplier = self.parse_count()?;
                    for (symbol, count) in inner {
                        accumulate(&mut counts, symbol, count * multiplier);
                    }
                }
                ')' => {
                    if depth == 0 {
                        return Err(FormulaError::UnbalancedParenthesis {
                            position: self.position,
                        });
                    }
                    return Ok(counts);
                }
                c if c.is_ascii_uppercase() => {
                    let mut symbol = c.to_string();
                    self.position += 1;
                    while let Some(&next) = self.chars.get(self.position) {
                        if !next.is_ascii_lowercase() {
                            break;
                        }
                        symbol.push(next);
                        self.position += 1;
                    }
                    let count = self.parse_count()?;
                    accumulate(&mut counts, symbol, count);
                }
                c if c.is_whitespace() => self.position += 1,
                other => {
                    return Err(FormulaError::UnexpectedCharacter {
                        character: other,
                        position: self.position,
                    });
                }
            }
        }

        Ok(counts)
    }

    fn parse_count(&mut self) -> Result<f64, FormulaError> {
        let start = self.position;
        while let Some(&next) = self.chars.get(self.position) {
            if !(next.is_ascii_digit() || next == '.') {
                break;
            }
            self.position += 1;
        }
        if start == self.position {
            return Ok(1.0);
        }

        let text: String = self.chars[start..self.position].iter().collect();
        text.parse::<f64>()
            .map_err(|_| FormulaError::InvalidCount {
                text: text.clone(),
                position: start,
            })
    }
}

fn accumulate(counts: &mut Vec<(String, f64)>, symbol: String, count: f64) {
    match counts.iter_mut().find(|(existing, _)| *existing == symbol) {
        Some((_, total)) => *total += count,
        None => counts.push((symbol, count)),
    }
}
