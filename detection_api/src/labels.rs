use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
};

/// Reads a label vocabulary, one class name per line, in class-id order.
///
/// Blank lines are skipped. Lines in the `label,red,green,blue` layout keep
/// only the label.
pub fn load_labels(filepath: &Path) -> io::Result<Vec<String>> {
    let file = File::open(filepath)?;
    let reader = io::BufReader::new(file);
    let mut labels = Vec::new();

    for line_result in reader.lines() {
        let line = line_result?;
        let label = line.split(',').next().unwrap_or_default().trim();
        if label.is_empty() {
            continue;
        }
        labels.push(label.to_string());
    }

    if labels.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("No labels found in {}", filepath.display()),
        ));
    }

    Ok(labels)
}
