use chrono::Local;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::acquire::epics::SystemId;
use crate::dsp::AcquisitionResult;
use crate::engine::results::ChannelResult;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Render the per-channel CMRR table as fixed-width text, one row per
/// channel in ascending order.
pub fn render_table(results: &[ChannelResult]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>4} | {:>12} | {:>12} | {:>12} | {:>12} | {:>10}\n",
        "CH", "standard dB", "standard Hz", "common dB", "common Hz", "CMRR dB"
    ));
    out.push_str(&"-".repeat(78));
    out.push('\n');
    for r in results {
        out.push_str(&format!(
            "{:>4} | {:>12.3} | {:>12.1} | {:>12.3} | {:>12.1} | {:>10.3}\n",
            r.channel_index,
            r.standard.peak_db,
            r.standard.peak_freq_hz,
            r.common_mode.peak_db,
            r.common_mode.peak_freq_hz,
            r.cmrr,
        ));
    }
    out
}

fn render_header(id: &SystemId) -> String {
    let mut out = String::new();
    out.push_str(&format!("CMRR test report - {}\n", id.carrier));
    out.push_str(&format!("date: {}\n", Local::now().format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("software version: {}\n", id.software_version));
    out.push_str(&format!("fpga version: {}\n", id.fpga_version));
    for (site, serial) in &id.site_serials {
        out.push_str(&format!("site {site} serial: {serial}\n"));
    }
    for (site, temp) in &id.site_temperatures {
        out.push_str(&format!("site {site} temperature: {temp}\n"));
    }
    out.push('\n');
    out
}

/// Write the run report into the per-carrier directory and return its path.
pub fn write_report(
    carrier_dir: &Path,
    id: &SystemId,
    results: &[ChannelResult],
    file_name: &str,
) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(carrier_dir)?;
    let path = carrier_dir.join(file_name);
    let mut file = fs::File::create(&path)?;
    file.write_all(render_header(id).as_bytes())?;
    file.write_all(render_table(results).as_bytes())?;
    info!("report written to {}", path.display());
    Ok(path)
}

/// Per-channel waveform dumps: frequency axis and amplitude axis as text,
/// one value per line, under `module_{m}/CH{ch:02}`.
#[derive(Debug, Clone)]
pub struct WaveformStore {
    root: PathBuf,
}

impl WaveformStore {
    pub fn new(carrier_dir: &Path) -> Self {
        Self { root: carrier_dir.to_path_buf() }
    }

    pub fn save(
        &self,
        module: u32,
        channel: u32,
        spectrum: &AcquisitionResult,
    ) -> Result<(), ReportError> {
        let dir = self.root.join(format!("module_{module}")).join(format!("CH{channel:02}"));
        fs::create_dir_all(&dir)?;
        write_column(&dir.join("frequency_data"), &spectrum.freq_hz)?;
        write_column(&dir.join("power_data"), &spectrum.magnitude_db)?;
        Ok(())
    }
}

fn write_column(path: &Path, values: &[f64]) -> Result<(), ReportError> {
    let mut file = fs::File::create(path)?;
    for v in values {
        writeln!(file, "{v}")?;
    }
    Ok(())
}

/// Copy the whole per-carrier working directory into a timestamped
/// directory under the final-data root.
pub fn archive_run(carrier_dir: &Path, final_root: &Path) -> Result<PathBuf, ReportError> {
    let name = format!(
        "{}_{}",
        carrier_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "run".to_string()),
        Local::now().format("%Y%m%d_%H%M%S")
    );
    let dest = final_root.join(name);
    copy_tree(carrier_dir, &dest)?;
    info!("archived {} to {}", carrier_dir.display(), dest.display());
    Ok(dest)
}

fn copy_tree(src: &Path, dest: &Path) -> Result<(), ReportError> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::results::Measurement;
    use crate::engine::thresholds::TestMode;

    fn result(channel_index: usize) -> ChannelResult {
        let standard = Measurement {
            mode: TestMode::Standard,
            channel_index,
            peak_db: -4.0,
            peak_freq_hz: 100_000.0,
        };
        let common_mode = Measurement {
            mode: TestMode::CommonMode,
            channel_index,
            peak_db: -100.0,
            peak_freq_hz: 99_750.0,
        };
        ChannelResult {
            channel_index,
            standard,
            common_mode,
            cmrr: standard.peak_db - common_mode.peak_db,
        }
    }

    #[test]
    fn test_table_has_one_row_per_channel() {
        let table = render_table(&[result(1), result(2)]);
        // header + separator + two rows
        assert_eq!(table.lines().count(), 4);
        assert!(table.contains("96.000"));
    }

    #[test]
    fn test_waveform_store_layout() {
        let dir = std::env::temp_dir().join(format!("cmrr_store_{}", std::process::id()));
        let store = WaveformStore::new(&dir);
        let spectrum = AcquisitionResult::new(vec![0.0, 100.0], vec![-80.0, -3.0]);
        store.save(1, 9, &spectrum).unwrap();

        let ch_dir = dir.join("module_1").join("CH09");
        assert!(ch_dir.join("frequency_data").is_file());
        assert!(ch_dir.join("power_data").is_file());
        let power = fs::read_to_string(ch_dir.join("power_data")).unwrap();
        assert_eq!(power.lines().count(), 2);
        fs::remove_dir_all(&dir).unwrap();
    }
}
