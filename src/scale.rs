// Scale factory: maps data domains onto pixel ranges

use std::collections::HashSet;

/// Fraction of each band step left as padding, inside and outside.
pub const BAND_PADDING: f64 = 0.1;

/// Continuous `value -> pixel` mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
    empty: bool,
}

impl LinearScale {
    /// A scale with no domain: maps everything to the range start.
    pub fn empty(range: (f64, f64)) -> Self {
        Self {
            domain: (0.0, 0.0),
            range,
            empty: true,
        }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn map(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let span = d1 - d0;
        if self.empty || span == 0.0 || !span.is_finite() {
            return self.range.0;
        }
        self.range.0 + (value - d0) / span * (self.range.1 - self.range.0)
    }

    pub fn invert(&self, pixel: f64) -> f64 {
        let (r0, r1) = self.range;
        let span = r1 - r0;
        if self.empty || span == 0.0 {
            return self.domain.0;
        }
        self.domain.0 + (pixel - r0) / span * (self.domain.1 - self.domain.0)
    }

    /// Round-number ticks inside the domain
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (d0, d1) = self.domain;
        if self.empty || count == 0 || d0 == d1 {
            return Vec::new();
        }
        let (lo, hi) = if d0 < d1 { (d0, d1) } else { (d1, d0) };
        let step = tick_increment(lo, hi, count);
        if step == 0.0 || !step.is_finite() {
            return Vec::new();
        }
        if step > 0.0 {
            let first = (lo / step).ceil() as i64;
            let last = (hi / step).floor() as i64;
            (first..=last).map(|i| clean_float(i as f64 * step)).collect()
        } else {
            // Negative increments are inverted steps (1 / -step)
            let inverse = -step;
            let first = (lo * inverse).ceil() as i64;
            let last = (hi * inverse).floor() as i64;
            (first..=last).map(|i| clean_float(i as f64 / inverse)).collect()
        }
    }
}

/// Discrete keys mapped to equal-width bands with padding.
#[derive(Debug, Clone, PartialEq)]
pub struct BandScale {
    domain: Vec<String>,
    range: (f64, f64),
    padding: f64,
    step: f64,
    start: f64,
}

impl BandScale {
    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn bandwidth(&self) -> f64 {
        if self.domain.is_empty() {
            return 0.0;
        }
        self.step * (1.0 - self.padding)
    }

    pub fn band_start(&self, key: &str) -> Option<f64> {
        let idx = self.domain.iter().position(|k| k == key)?;
        Some(self.start + self.step * idx as f64)
    }

    /// Centre of the band, where tick labels sit
    pub fn band_center(&self, key: &str) -> Option<f64> {
        self.band_start(key).map(|start| start + self.bandwidth() / 2.0)
    }
}

/// Discrete keys mapped to evenly spaced points.
#[derive(Debug, Clone, PartialEq)]
pub struct PointScale {
    domain: Vec<String>,
    range: (f64, f64),
}

impl PointScale {
    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    pub fn map(&self, key: &str) -> Option<f64> {
        let idx = self.domain.iter().position(|k| k == key)?;
        let (r0, r1) = self.range;
        if self.domain.len() == 1 {
            return Some((r0 + r1) / 2.0);
        }
        let step = (r1 - r0) / (self.domain.len() - 1) as f64;
        Some(r0 + step * idx as f64)
    }
}

/// Builds scales from data. All constructors accept an empty domain.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleFactory;

impl ScaleFactory {
    /// Linear scale over the extent of `values`, niced.
    pub fn linear(values: &[f64], range: (f64, f64), override_domain: Option<(f64, f64)>) -> LinearScale {
        if let Some(domain) = override_domain {
            return Self::from_domain(domain, range);
        }
        match MinMax::of(values) {
            Some(mm) => Self::from_domain(mm.widened(), range),
            None => LinearScale::empty(range),
        }
    }

    /// Linear scale that always includes zero, as value axes use.
    pub fn linear_from_zero(values: &[f64], range: (f64, f64), override_domain: Option<(f64, f64)>) -> LinearScale {
        if let Some(domain) = override_domain {
            return Self::from_domain(domain, range);
        }
        match MinMax::of(values) {
            Some(mm) => {
                let (min, max) = (mm.min.min(0.0), mm.max.max(0.0));
                let domain = if min == max { (0.0, 1.0) } else { (min, max) };
                Self::from_domain(domain, range)
            }
            None => LinearScale::empty(range),
        }
    }

    /// Band scale over unique keys in first-seen order
    pub fn band<'k>(keys: impl IntoIterator<Item = &'k str>, range: (f64, f64)) -> BandScale {
        let domain = unique_in_order(keys);
        let n = domain.len() as f64;
        let padding = BAND_PADDING;
        let span = range.1 - range.0;
        let (step, start) = if domain.is_empty() {
            (0.0, range.0)
        } else {
            let step = span / (n - padding + 2.0 * padding).max(1.0);
            let start = range.0 + (span - step * (n - padding)) / 2.0;
            (step, start)
        };
        BandScale {
            domain,
            range,
            padding,
            step,
            start,
        }
    }

    /// Point scale over unique keys in first-seen order
    pub fn point<'k>(keys: impl IntoIterator<Item = &'k str>, range: (f64, f64)) -> PointScale {
        PointScale {
            domain: unique_in_order(keys),
            range,
        }
    }

    fn from_domain(domain: (f64, f64), range: (f64, f64)) -> LinearScale {
        LinearScale {
            domain: nice(domain.0, domain.1, 10),
            range,
            empty: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MinMax {
    min: f64,
    max: f64,
}

impl MinMax {
    fn of(values: &[f64]) -> Option<Self> {
        let mut iter = values.iter().copied().filter(|v| v.is_finite());
        let first = iter.next()?;
        Some(iter.fold(Self { min: first, max: first }, |mm, v| Self {
            min: mm.min.min(v),
            max: mm.max.max(v),
        }))
    }

    /// A single value gets a unit span around it
    fn widened(self) -> (f64, f64) {
        if self.min == self.max {
            (self.min - 1.0, self.max + 1.0)
        } else {
            (self.min, self.max)
        }
    }
}

fn unique_in_order<'k>(keys: impl IntoIterator<Item = &'k str>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.into_iter()
        .filter(|k| seen.insert(*k))
        .map(str::to_string)
        .collect()
}

/// Round step for roughly `count` ticks over `[start, stop]`.
///
/// Steps below one come back negated and inverted (`-5.0` means a step of `0.2`).
fn tick_increment(start: f64, stop: f64, count: usize) -> f64 {
    let step = (stop - start) / count.max(1) as f64;
    if step <= 0.0 || !step.is_finite() {
        return 0.0;
    }
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    if power >= 0.0 {
        factor * 10f64.powf(power)
    } else {
        -10f64.powf(-power) / factor
    }
}

/// Extend the domain outward to round step multiples
fn nice(d0: f64, d1: f64, count: usize) -> (f64, f64) {
    let reversed = d1 < d0;
    let (mut start, mut stop) = if reversed { (d1, d0) } else { (d0, d1) };
    if start == stop || !start.is_finite() || !stop.is_finite() {
        return (d0, d1);
    }

    let mut prestep = 0.0;
    for _ in 0..10 {
        let step = tick_increment(start, stop, count);
        if step == prestep || step == 0.0 || !step.is_finite() {
            break;
        }
        if step > 0.0 {
            start = (start / step).floor() * step;
            stop = (stop / step).ceil() * step;
        } else {
            start = (start * step).ceil() / step;
            stop = (stop * step).floor() / step;
        }
        start = clean_float(start);
        stop = clean_float(stop);
        prestep = step;
    }

    if reversed {
        (stop, start)
    } else {
        (start, stop)
    }
}

fn clean_float(v: f64) -> f64 {
    let rounded = (v * 1e12).round() / 1e12;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
