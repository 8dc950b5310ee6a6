use crate::{connect, Inlet, Resolver, StreamError};
use flashrig_sync::StopSignal;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long one blocking pull may wait before the loop re-checks the stop
/// signal. Bounds termination latency.
pub const PULL_TIMEOUT: Duration = Duration::from_secs(5);

/// Pick a path that never clobbers an existing file: `name.txt`,
/// `name_1.txt`, `name_2.txt`, … in order.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("record");
    let ext = path.extension().and_then(|s| s.to_str());
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    for n in 1u32.. {
        let name = match ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!()
}

/// Pull samples and append them to `path` as one line per record, in
/// arrival order, until the stop signal is set or the stream closes.
/// Returns the path actually written (suffixed on collision).
pub fn record<I: Inlet>(
    inlet: &I,
    path: &Path,
    stop: &StopSignal,
    pull_timeout: Duration,
) -> Result<PathBuf, StreamError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let path = unique_path(path);
    let mut writer = BufWriter::new(File::create(&path)?);
    log::info!("recording to {}", path.display());

    while !stop.is_set() {
        match inlet.pull_sample(pull_timeout) {
            Ok(Some(sample)) => writeln!(writer, "{}", sample.to_line())?,
            // Pull timed out with no data; keep polling.
            Ok(None) => {}
            Err(StreamError::Closed(name)) => {
                log::debug!("stream {name} closed, recorder stopping");
                break;
            }
            Err(e) => return Err(e),
        }
    }
    writer.flush()?;
    Ok(path)
}

/// One recorder worker: discover a stream, then record it to
/// `dir/file_name` until termination. Discovery failure is fatal to this
/// recorder only.
pub struct RecorderTask<R: Resolver> {
    pub resolver: R,
    pub stream_name: String,
    pub dir: PathBuf,
    pub file_name: String,
    pub max_retries: u32,
    pub resolve_timeout: Duration,
}

impl<R: Resolver> RecorderTask<R> {
    /// `connected` fires once the discovery phase is over, whether or not it
    /// succeeded; the launcher uses it to open the start gate.
    pub fn run(
        &self,
        stop: &StopSignal,
        connected: Option<&crossbeam_channel::Sender<()>>,
    ) -> Result<PathBuf, StreamError> {
        log::info!("looking for a {} stream...", self.stream_name);
        let resolved = connect(
            &self.resolver,
            &self.stream_name,
            self.max_retries,
            self.resolve_timeout,
        );
        if let Some(tx) = connected {
            let _ = tx.send(());
        }
        let inlet = resolved?;
        let written = record(&inlet, &self.dir.join(&self.file_name), stop, PULL_TIMEOUT)?;
        log::info!("{} recorder ended", self.stream_name);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::LocalHub;
    use crate::Outlet;
    use flashrig_core::SampleRecord;
    use std::thread;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "flashrig-recorder-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn suffixing_is_deterministic_and_never_clobbers() {
        let dir = scratch_dir("suffix");
        let base = dir.join("code_eeg.txt");

        assert_eq!(unique_path(&base), base);
        fs::write(&base, "first").unwrap();
        let second = unique_path(&base);
        assert_eq!(second, dir.join("code_eeg_1.txt"));
        fs::write(&second, "second").unwrap();
        assert_eq!(unique_path(&base), dir.join("code_eeg_2.txt"));
        // the first write is untouched
        assert_eq!(fs::read_to_string(&base).unwrap(), "first");
    }

    #[test]
    fn records_lines_in_arrival_order_until_stream_closes() {
        let dir = scratch_dir("order");
        let hub = LocalHub::new();
        let outlet = hub.create_outlet("eeg");
        let inlet = hub.resolve("eeg", Duration::from_millis(10)).unwrap();
        let stop = StopSignal::new();

        let writer = {
            let path = dir.join("code_eeg.txt");
            let stop = stop.clone();
            thread::spawn(move || record(&inlet, &path, &stop, Duration::from_millis(50)))
        };

        for i in 0..5 {
            outlet
                .push_sample(&SampleRecord::new(i as f64, vec![i as f64 * 2.0]))
                .unwrap();
        }
        drop(outlet);

        let written = writer.join().unwrap().unwrap();
        let contents = fs::read_to_string(&written).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "0,0");
        assert_eq!(lines[4], "4,8");
    }

    #[test]
    fn stop_signal_ends_an_idle_recorder() {
        let dir = scratch_dir("stop");
        let hub = LocalHub::new();
        let _outlet = hub.create_outlet("quiet");
        let inlet = hub.resolve("quiet", Duration::from_millis(10)).unwrap();
        let stop = StopSignal::new();
        stop.set();

        let written = record(
            &inlet,
            &dir.join("code_quiet.txt"),
            &stop,
            Duration::from_millis(20),
        )
        .unwrap();
        assert_eq!(fs::read_to_string(written).unwrap(), "");
    }

    #[test]
    fn missing_stream_is_fatal_to_the_recorder_only() {
        let dir = scratch_dir("missing");
        let stop = StopSignal::new();
        let task = RecorderTask {
            resolver: LocalHub::new(),
            stream_name: "absent".into(),
            dir,
            file_name: "code_absent.txt".into(),
            max_retries: 2,
            resolve_timeout: Duration::from_millis(10),
        };
        let (tx, rx) = crossbeam_channel::unbounded();
        let err = task.run(&stop, Some(&tx)).unwrap_err();
        assert!(matches!(err, StreamError::NotFound { .. }));
        // the launcher is still unblocked after a failed discovery
        assert!(rx.try_recv().is_ok());
    }
}
