use std::{
    fs::File,
    io::{BufWriter, Write},
};

use speedo_core::GaugeFrame;

use crate::{MeterConfig, MeterResult, OutputFormat};

/// Получатель кадров шкалы.
pub trait FrameSink: Send {
    fn write_frame(
        &mut self,
        frame: &GaugeFrame,
    ) -> MeterResult<()>;

    fn flush(&mut self) -> MeterResult<()>;
}

/// Строка на кадр, для терминала.
pub struct TextSink<W: Write + Send> {
    writer: BufWriter<W>,
}

/// JSON объект на кадр (JSON Lines).
pub struct JsonLinesSink<W: Write + Send> {
    writer: BufWriter<W>,
}

impl<W: Write + Send> TextSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }
}

impl<W: Write + Send> FrameSink for TextSink<W> {
    fn write_frame(
        &mut self,
        frame: &GaugeFrame,
    ) -> MeterResult<()> {
        writeln!(self.writer, "{frame}")?;
        Ok(())
    }

    fn flush(&mut self) -> MeterResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }
}

impl<W: Write + Send> FrameSink for JsonLinesSink<W> {
    fn write_frame(
        &mut self,
        frame: &GaugeFrame,
    ) -> MeterResult<()> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> MeterResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Создаёт получатель кадров по конфигурации: файл или stdout.
pub fn create_sink(config: &MeterConfig) -> MeterResult<Box<dyn FrameSink>> {
    let sink: Box<dyn FrameSink> = match (&config.output_path, config.output_format) {
        (Some(path), OutputFormat::Text) => Box::new(TextSink::new(File::create(path)?)),
        (Some(path), OutputFormat::Json) => Box::new(JsonLinesSink::new(File::create(path)?)),
        (None, OutputFormat::Text) => Box::new(TextSink::new(std::io::stdout())),
        (None, OutputFormat::Json) => Box::new(JsonLinesSink::new(std::io::stdout())),
    };

    Ok(sink)
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;

    fn frame(
        t_ms: u64,
        kmph: i64,
    ) -> GaugeFrame {
        GaugeFrame {
            t_ms,
            needle_deg: kmph as f64,
            top_arc_deg: 0.0,
            right_arc_deg: 0.0,
            readout_kmph: kmph,
        }
    }

    #[test]
    fn test_text_sink_one_line_per_frame() {
        let tmp = NamedTempFile::new().unwrap();
        {
            let mut sink = TextSink::new(File::create(tmp.path()).unwrap());
            sink.write_frame(&frame(0, 0)).unwrap();
            sink.write_frame(&frame(50, 12)).unwrap();
            sink.flush().unwrap();
        }

        let text = std::fs::read_to_string(tmp.path()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("12 km/h"));
    }

    #[test]
    fn test_json_sink_frames_parse_back() {
        let tmp = NamedTempFile::new().unwrap();
        {
            let mut sink = JsonLinesSink::new(File::create(tmp.path()).unwrap());
            for i in 0..3 {
                sink.write_frame(&frame(i * 50, i as i64 * 10)).unwrap();
            }
            sink.flush().unwrap();
        }

        let text = std::fs::read_to_string(tmp.path()).unwrap();
        let frames: Vec<GaugeFrame> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2], frame(100, 20));
    }

    #[test]
    fn test_create_sink_to_file() {
        let tmp = NamedTempFile::new().unwrap();
        let cfg = MeterConfig {
            output_path: Some(tmp.path().to_path_buf()),
            output_format: OutputFormat::Json,
            ..MeterConfig::default()
        };

        let mut sink = create_sink(&cfg).unwrap();
        sink.write_frame(&frame(0, 42)).unwrap();
        sink.flush().unwrap();

        let text = std::fs::read_to_string(tmp.path()).unwrap();
        assert!(text.contains("\"readout_kmph\":42"));
    }
}
