//! Assemble feature vectors into a rectangular table.

use crate::error::Error;
use polars::prelude::*;

/// Build a DataFrame with one row per feature vector and `size` columns named
/// `0..size`. Row order is kept as given.
pub fn features_to_df(rows: &[Vec<u32>], size: usize) -> Result<DataFrame, Error> {
    if let Some((row, found)) = rows
        .iter()
        .map(Vec::len)
        .enumerate()
        .find(|(_, len)| *len != size)
    {
        return Err(Error::RaggedTable {
            row,
            expected: size,
            found,
        });
    }

    let columns: Vec<Column> = (0..size)
        .map(|j| {
            Column::new(
                j.to_string().into(),
                rows.iter().map(|r| r[j]).collect::<Vec<u32>>(),
            )
        })
        .collect();

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_and_order() {
        let rows = vec![vec![1, 0, 0], vec![0, 2, 0], vec![0, 0, 3]];
        let df = features_to_df(&rows, 3).unwrap();

        assert_eq!(df.shape(), (3, 3));
        let diagonal: Vec<u32> = (0..3)
            .map(|i| {
                df.column(&i.to_string())
                    .unwrap()
                    .u32()
                    .unwrap()
                    .get(i)
                    .unwrap()
            })
            .collect();
        assert_eq!(diagonal, [1, 2, 3]);
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let df = features_to_df(&[], 4092).unwrap();
        assert_eq!(df.shape(), (0, 4092));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows = vec![vec![1, 0, 0], vec![0, 2]];
        assert!(matches!(
            features_to_df(&rows, 3),
            Err(Error::RaggedTable {
                row: 1,
                expected: 3,
                found: 2
            })
        ));
    }
}
