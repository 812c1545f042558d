// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Assemble (test, channel) selections into a dense 4-D array.
// Author: Lukas Bower

use log::warn;
use ndarray::Array4;

use crate::container::Series;
use crate::error::Result;
use crate::tree::Group;

/// Result of [`slice`].
#[derive(Debug, Clone, PartialEq)]
pub enum Slice {
    /// `[sample, repeat, test, channel]`.
    Dense(Array4<f64>),
    /// Per-cell series indexed `[test][channel]` when lengths differ.
    Ragged(Vec<Vec<Series>>),
}

impl Slice {
    /// The dense array, if every cell had the same shape.
    pub fn as_dense(&self) -> Option<&Array4<f64>> {
        match self {
            Slice::Dense(array) => Some(array),
            Slice::Ragged(_) => None,
        }
    }

    /// Whether the fallback structure was used.
    pub fn is_ragged(&self) -> bool {
        matches!(self, Slice::Ragged(_))
    }
}

/// Read every `(test, channel)` cell below `group`.
///
/// `tests` are `(campaign, repeat)` pairs and `channels` are
/// `(signal, sensor)` pairs; each cell is the leaf at
/// `<campaign>/<repeat>/<sensor>/<signal>` relative to `group`.
pub fn slice<T, C>(group: &Group, tests: &[(T, T)], channels: &[(C, C)]) -> Result<Slice>
where
    T: AsRef<str>,
    C: AsRef<str>,
{
    let mut cells = Vec::with_capacity(tests.len());
    for (campaign, repeat) in tests {
        let mut row = Vec::with_capacity(channels.len());
        for (signal, sensor) in channels {
            let path = format!(
                "{}/{}/{}/{}",
                campaign.as_ref(),
                repeat.as_ref(),
                sensor.as_ref(),
                signal.as_ref()
            );
            row.push(group.leaf(&path)?.read()?);
        }
        cells.push(row);
    }
    Ok(assemble(cells, tests.len(), channels.len()))
}

fn assemble(cells: Vec<Vec<Series>>, tests: usize, channels: usize) -> Slice {
    let Some((samples, repeats)) = cells
        .iter()
        .flatten()
        .next()
        .map(|first| (first.samples(), first.repeats()))
    else {
        return Slice::Dense(Array4::zeros((0, 0, tests, channels)));
    };
    let mismatch = cells.iter().enumerate().find_map(|(t, row)| {
        row.iter()
            .position(|cell| cell.samples() != samples || cell.repeats() != repeats)
            .map(|c| (t, c, row[c].shape().to_vec()))
    });
    if let Some((t, c, shape)) = mismatch {
        warn!(
            "ragged selection: cell ({t}, {c}) has shape {shape:?}, expected ({samples}, {repeats}); returning nested series"
        );
        return Slice::Ragged(cells);
    }
    Slice::Dense(Array4::from_shape_fn(
        (samples, repeats, tests, channels),
        |(s, r, t, c)| cells[t][c].values()[s * repeats + r],
    ))
}
