//! The four-line text encoding of one matching instance.
//!
//! ```text
//! sx_0 sx_1 ... sx_{N-1}
//! sy_0 sy_1 ... sy_{N-1}
//! tx_0 tx_1 ... tx_{N-1}
//! ty_0 ty_1 ... ty_{N-1} [perm_0 ... perm_{N-1} weight]
//! ```
//!
//! The bracketed labels are present only for supervised records.

use nalgebra::Matrix4xX;

use crate::geometry::PointSet;
use crate::permutation;
use crate::solver::Matching;
use crate::{Error, Result};

const LINES: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    pub points: PointSet,
    pub labels: Option<Matching>,
}

impl DataRecord {
    pub fn new(points: PointSet, labels: Option<Matching>) -> Self {
        Self { points, labels }
    }

    pub fn has_labels(&self) -> bool {
        self.labels.is_some()
    }

    pub fn encode(&self) -> String {
        let points = self.points.as_matrix();
        let mut out = String::new();
        for row in 0..LINES {
            let mut tokens: Vec<String> = points.row(row).iter().map(f64::to_string).collect();
            if row == LINES - 1 {
                if let Some(labels) = &self.labels {
                    tokens.extend(labels.perm.iter().map(usize::to_string));
                    tokens.push(labels.weight.to_string());
                }
            }
            out.push_str(&tokens.join(" "));
            out.push('\n');
        }
        out
    }

    /// Parses a record written by [`DataRecord::encode`].
    ///
    /// `has_labels` must agree with what the record holds; a disagreement is
    /// reported as [`Error::LabelMismatch`] rather than guessed around.
    pub fn decode(text: &str, has_labels: bool) -> Result<Self> {
        let lines: Vec<Vec<&str>> = text
            .lines()
            .map(|line| line.split_whitespace().collect())
            .collect();
        if lines.len() != LINES {
            return Err(Error::malformed(
                lines.len(),
                format!("expected {LINES} lines, found {}", lines.len()),
            ));
        }

        let n = lines[0].len();
        let mut values = Vec::with_capacity(LINES * n);
        for (row, tokens) in lines.iter().enumerate() {
            let width = match row {
                3 => {
                    let found = match tokens.len() {
                        t if t == n => false,
                        t if t == 2 * n + 1 => true,
                        t => {
                            return Err(Error::malformed(
                                row + 1,
                                format!("expected {n} or {} tokens, found {t}", 2 * n + 1),
                            ))
                        }
                    };
                    if found != has_labels {
                        return Err(Error::LabelMismatch {
                            expected: has_labels,
                            found,
                        });
                    }
                    n
                }
                _ if tokens.len() != n => {
                    return Err(Error::malformed(
                        row + 1,
                        format!("expected {n} tokens, found {}", tokens.len()),
                    ))
                }
                _ => n,
            };
            for token in &tokens[..width] {
                values.push(parse(token, row + 1)?);
            }
        }

        let labels = if has_labels {
            let tail = &lines[3][n..];
            let perm = tail[..n]
                .iter()
                .map(|token| parse::<usize>(token, LINES))
                .collect::<Result<Vec<_>>>()?;
            if !permutation::is_permutation(&perm) {
                return Err(Error::malformed(LINES, "labels are not a permutation"));
            }
            let weight = parse(tail[n], LINES)?;
            Some(Matching { perm, weight })
        } else {
            None
        };

        let points = PointSet::new(Matrix4xX::from_row_slice(&values));
        Ok(Self { points, labels })
    }
}

fn parse<T: std::str::FromStr>(token: &str, line: usize) -> Result<T> {
    token
        .parse()
        .map_err(|_| Error::malformed(line, format!("cannot parse {token:?}")))
}
