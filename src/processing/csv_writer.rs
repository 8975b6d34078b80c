use crate::discretization::cloud::PointCloud;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

fn invalid_input(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}

/// Write equally long columns to a CSV file in scientific notation. An empty
/// `headers` slice writes no header line.
pub fn write_columns<P: AsRef<Path>>(path: P, headers: &[&str], columns: &[&[f64]]) -> io::Result<()> {
    if !headers.is_empty() && headers.len() != columns.len() {
        return Err(invalid_input(format!(
            "{} headers for {} columns",
            headers.len(),
            columns.len()
        )));
    }
    let rows = columns.first().map_or(0, |c| c.len());
    if let Some(bad) = columns.iter().position(|c| c.len() != rows) {
        return Err(invalid_input(format!(
            "column {bad} has {} values, expected {rows}",
            columns[bad].len()
        )));
    }

    let mut out = BufWriter::new(File::create(path)?);
    if !headers.is_empty() {
        writeln!(out, "{}", headers.join(","))?;
    }
    for i in 0..rows {
        for (k, column) in columns.iter().enumerate() {
            if k > 0 {
                out.write_all(b",")?;
            }
            write!(out, "{:.15e}", column[i])?;
        }
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// Two named columns, e.g. an error history over time.
pub fn write_xy<P: AsRef<Path>>(
    path: P,
    x_header: &str,
    y_header: &str,
    x_data: &[f64],
    y_data: &[f64],
) -> io::Result<()> {
    write_columns(path, &[x_header, y_header], &[x_data, y_data])
}

/// Write a cloud in the `*_p.csv` layout: `x,y,flag` per node, no header.
/// Coordinates use the shortest exact representation so a cloud read back
/// is bit-identical.
pub fn write_cloud<P: AsRef<Path>>(path: P, cloud: &PointCloud) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    for n in &cloud.nodes {
        writeln!(file, "{},{},{}", n.position.x, n.position.y, n.kind.flag())?;
    }
    file.flush()
}

/// Write nodal fields next to the node coordinates, one column per field.
pub fn write_field<P: AsRef<Path>>(
    path: P,
    cloud: &PointCloud,
    fields: &[(&str, &[f64])],
) -> io::Result<()> {
    if let Some((name, _)) = fields.iter().find(|(_, v)| v.len() != cloud.len()) {
        return Err(invalid_input(format!(
            "field '{name}' does not have {} values",
            cloud.len()
        )));
    }

    let xs: Vec<f64> = cloud.nodes.iter().map(|n| n.position.x).collect();
    let ys: Vec<f64> = cloud.nodes.iter().map(|n| n.position.y).collect();
    let flags: Vec<f64> = cloud.nodes.iter().map(|n| n.kind.flag() as f64).collect();

    let mut headers = vec!["x", "y", "flag"];
    let mut columns = vec![xs.as_slice(), ys.as_slice(), flags.as_slice()];
    for (name, values) in fields {
        headers.push(*name);
        columns.push(*values);
    }
    write_columns(path, &headers, &columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::cloud::NodeKind;
    use glam::DVec2;
    use std::fs;

    #[test]
    fn columns_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let (a, b) = ([1.0, 2.0, 3.0], [4.0, 5.0, 6.0]);

        write_columns(&path, &["a", "b"], &[&a[..], &b[..]]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("a,b\n"));
        assert_eq!(content.lines().count(), 4);
        assert_eq!(content.lines().nth(1), Some("1.000000000000000e0,4.000000000000000e0"));
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let r = write_xy(dir.path().join("xy.csv"), "t", "e", &[0.0, 1.0], &[0.5]);
        assert_eq!(r.unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn field_length_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let cloud = PointCloud::new(vec![(DVec2::ZERO, NodeKind::Boundary)]);
        let bad = [1.0, 2.0];
        assert!(write_field(dir.path().join("f.csv"), &cloud, &[("u", &bad[..])]).is_err());
    }
}
