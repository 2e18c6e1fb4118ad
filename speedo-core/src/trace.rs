//! Трасса скорости: JSON Lines, одна [`SpeedSample`] на строку.
//!
//! ```text
//! {"timestamp_ms":0,"speed_mps":0.0}
//! {"timestamp_ms":500,"speed_mps":1.25}
//! ```
//!
//! Пустые строки пропускаются. `timestamp_ms` необязателен (по умолчанию 0).

use std::io::{BufRead, BufReader, BufWriter, Read, Write};

use speedo_types::{SpeedSample, SpeedoError, SpeedoResult};

/// Потоковый писатель трассы.
pub struct TraceWriter<W: Write> {
    writer: BufWriter<W>,
    records: u64,
}

/// Потоковый читатель трассы.
pub struct TraceReader<R: Read> {
    reader: BufReader<R>,
    line_buf: String,
    line_no: u64,
    stats: ReadStats,
}

/// Статистика, накопленная [`TraceReader`] в процессе чтения.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReadStats {
    /// Успешно прочитанных записей.
    pub records_ok: u64,
    /// Записей с ошибкой разбора или недопустимой скоростью.
    pub records_invalid: u64,
    /// Всего прочитано строк (включая пустые).
    pub lines_read: u64,
}

impl<W: Write> TraceWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
            records: 0,
        }
    }

    /// Записывает одну выборку.
    pub fn write_sample(
        &mut self,
        sample: &SpeedSample,
    ) -> SpeedoResult<()> {
        serde_json::to_writer(&mut self.writer, sample)?;
        self.writer.write_all(b"\n")?;
        self.records += 1;

        Ok(())
    }

    /// Сбрасывает буфер и возвращает внутренний поток.
    pub fn finish(self) -> SpeedoResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| SpeedoError::Io(e.into_error()))
    }

    pub fn records(&self) -> u64 {
        self.records
    }
}

impl<R: Read> TraceReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            line_buf: String::new(),
            line_no: 0,
            stats: ReadStats::default(),
        }
    }

    /// Возвращает следующую выборку или `None` на EOF.
    ///
    /// Ошибка в строке не прерывает чтение: следующий вызов продолжит со
    /// следующей строки.
    pub fn next_sample(&mut self) -> Option<SpeedoResult<SpeedSample>> {
        loop {
            self.line_buf.clear();

            match self.reader.read_line(&mut self.line_buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(SpeedoError::Io(e))),
            }

            self.line_no += 1;
            self.stats.lines_read += 1;

            let line = self.line_buf.trim();
            if line.is_empty() {
                continue;
            }

            let sample: SpeedSample = match serde_json::from_str(line) {
                Ok(s) => s,
                Err(source) => {
                    self.stats.records_invalid += 1;
                    return Some(Err(SpeedoError::MalformedTrace {
                        line: self.line_no,
                        source,
                    }));
                }
            };

            if let Err(e) = sample.validate(self.line_no) {
                self.stats.records_invalid += 1;
                return Some(Err(e));
            }

            self.stats.records_ok += 1;
            return Some(Ok(sample));
        }
    }

    pub fn stats(&self) -> &ReadStats {
        &self.stats
    }
}

impl<R: Read> Iterator for TraceReader<R> {
    type Item = SpeedoResult<SpeedSample>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_sample()
    }
}

/// Читает все выборки, останавливаясь на первой ошибке.
pub fn read_all_samples<R: Read>(reader: &mut TraceReader<R>) -> SpeedoResult<Vec<SpeedSample>> {
    let mut samples = Vec::new();

    while let Some(r) = reader.next_sample() {
        samples.push(r?);
    }

    Ok(samples)
}
