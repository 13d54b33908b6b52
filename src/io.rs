//! Dense text dumps of distributed matrices.
use crate::comm::Communicator;
use crate::sparse::DistributedCsrMatrix;
use eyre::WrapErr;
use nalgebra::DMatrix;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub const FD_MATRIX_FILE: &str = "FD_matrix.dat";
pub const AD_MATRIX_FILE: &str = "AD_matrix.dat";
pub const DIFFERENCE_MATRIX_FILE: &str = "FD_minus_AD_matrix.dat";

/// Formats `value` in scientific notation with `digits` fraction digits and a signed exponent
/// of at least two digits, e.g. `-1.25000e-03`.
pub fn format_scientific(value: f64, digits: usize) -> String {
    let formatted = format!("{:.*e}", digits, value);
    if let Some((mantissa, exponent)) = formatted.split_once('e') {
        if let Ok(exponent) = exponent.parse::<i32>() {
            let sign = if exponent < 0 { '-' } else { '+' };
            return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
        }
    }
    // Non-finite values have no exponent
    formatted
}

/// Renders a dense matrix with one row per line.
///
/// Every entry is right-aligned in a column of width `7 + digits` and followed by a space.
/// Entries that are exactly zero are written as `0`.
pub fn format_dense(matrix: &DMatrix<f64>, digits: usize) -> String {
    let width = 7 + digits;
    let mut output = String::new();
    for row in matrix.row_iter() {
        for &value in row.iter() {
            let entry = if value == 0.0 {
                "0".to_string()
            } else {
                format_scientific(value, digits)
            };
            output.push_str(&format!("{:>width$} ", entry, width = width));
        }
        output.push('\n');
    }
    output
}

pub fn write_dense_matrix(path: impl AsRef<Path>, matrix: &DMatrix<f64>, digits: usize) -> eyre::Result<()> {
    let path = path.as_ref();
    let file = File::create(path).wrap_err_with(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(format_dense(matrix, digits).as_bytes())
        .and_then(|_| writer.flush())
        .wrap_err_with(|| format!("Failed to write {}", path.display()))
}

/// Writes the finite-difference, reference and difference matrices to their fixed file
/// names in `output_dir`, overwriting existing files.
///
/// Collective: every rank takes part in gathering the matrices, rank 0 writes.
pub fn write_dense_dumps(
    output_dir: impl AsRef<Path>,
    fd: &DistributedCsrMatrix,
    ad: &DistributedCsrMatrix,
    difference: &DistributedCsrMatrix,
    digits: usize,
    comm: &impl Communicator,
) -> eyre::Result<()> {
    let dumps = [
        (FD_MATRIX_FILE, fd.to_dense(comm)),
        (AD_MATRIX_FILE, ad.to_dense(comm)),
        (DIFFERENCE_MATRIX_FILE, difference.to_dense(comm)),
    ];
    if comm.rank() != 0 {
        return Ok(());
    }

    let output_dir = output_dir.as_ref();
    create_dir_all(output_dir).wrap_err_with(|| format!("Failed to create directory {}", output_dir.display()))?;
    for (file_name, matrix) in &dumps {
        write_dense_matrix(output_dir.join(file_name), matrix, digits)?;
    }
    Ok(())
}
