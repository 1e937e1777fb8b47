use std::{
    fs::{self, File},
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use attrition_models::fitted::FittedModel;
use attrition_stats::survival::KaplanMeierCurve;

#[derive(Debug)]
pub(crate) enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<&Path>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_json(value)
    }

    pub fn from_output_path(output_path: Option<&Path>) -> anyhow::Result<Self> {
        match output_path {
            Some(path) => Output::open(path),
            None => Ok(Output::stdout()),
        }
    }

    pub fn stdout() -> Self {
        Output::Stdout {
            writer: io::stdout().lock(),
        }
    }

    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path: path.to_owned(),
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_string(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: &T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(&mut *self).with_context(|| {
            format!(
                "Failed to write newline after JSON to {}",
                self.display_path()
            )
        })?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path()))?;
        Ok(())
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub(crate) fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

pub(crate) fn read_model_file<P>(path: P) -> anyhow::Result<FittedModel>
where
    P: AsRef<Path>,
{
    let model: FittedModel = read_json_file("model", path)?;
    log::info!(
        "Loaded {} model trained at {} on {} records",
        model.kind().label(),
        model.trained_at,
        model.training_size
    );
    Ok(model)
}

/// Writes Kaplan-Meier curves of several groups into one CSV file with
/// columns `group,time,survival_prob,at_risk,events`.
pub(crate) fn save_km_curves<'a, I>(path: &Path, curves: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a KaplanMeierCurve)>,
{
    let mut output = Output::open(path)?;
    let mut writer = csv::Writer::from_writer(&mut output);
    writer
        .write_record(["group", "time", "survival_prob", "at_risk", "events"])
        .with_context(|| format!("Failed to write CSV header to {}", path.display()))?;
    for (group, km) in curves {
        for i in 0..km.times.len() {
            writer
                .write_record([
                    group.to_owned(),
                    km.times[i].to_string(),
                    km.survival_prob[i].to_string(),
                    km.at_risk[i].to_string(),
                    km.events[i].to_string(),
                ])
                .with_context(|| format!("Failed to write CSV data for group {group}"))?;
        }
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
    log::info!("KM curves saved to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_km_curves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("km").join("coach.csv");
        let yes = KaplanMeierCurve::from_data(vec![(1.0, true), (2.0, false)]);
        let no = KaplanMeierCurve::from_data(vec![(3.0, true)]);
        save_km_curves(&path, [("yes", &yes), ("no", &no)]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "group,time,survival_prob,at_risk,events\nyes,1,0.5,2,1\nno,3,0,1,1\n"
        );
    }

    #[test]
    fn test_save_and_read_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value.json");
        Output::save_json(&vec![1, 2, 3], Some(path.as_path())).unwrap();
        let value: Vec<u32> = read_json_file("test", &path).unwrap();
        assert_eq!(value, [1, 2, 3]);
    }
}
