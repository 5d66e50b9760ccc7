//! Counting and moment accumulators
//!
//! All of these have an exact inverse, so a sliding window can retract the
//! oldest input instead of rebuilding.

use super::{Input, PartialAggregate, SubtractPartialAggregate};
use chronofeat_core::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Count {
    n: i64,
}

impl PartialAggregate for Count {
    fn add(&mut self, _input: Input<'_>) {
        self.n += 1;
    }

    fn merge(&self, other: &Self) -> Self {
        Count { n: self.n + other.n }
    }

    fn evaluate(&self) -> Value {
        Value::Int(self.n)
    }
}

impl SubtractPartialAggregate for Count {
    fn subtract(&mut self, _input: Input<'_>) {
        self.n -= 1;
    }
}

/// Distinct values keyed by kind and display form, so `1` and `"1"` differ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountDistinct {
    freq: HashMap<String, usize>,
}

fn distinct_key(value: &Value) -> String {
    format!("{}:{}", value.type_name(), value)
}

impl PartialAggregate for CountDistinct {
    fn add(&mut self, input: Input<'_>) {
        *self.freq.entry(distinct_key(input.value)).or_insert(0) += 1;
    }

    fn merge(&self, other: &Self) -> Self {
        let mut freq = self.freq.clone();
        for (key, n) in &other.freq {
            *freq.entry(key.clone()).or_insert(0) += n;
        }
        CountDistinct { freq }
    }

    fn evaluate(&self) -> Value {
        Value::Int(self.freq.len() as i64)
    }
}

impl SubtractPartialAggregate for CountDistinct {
    fn subtract(&mut self, input: Input<'_>) {
        let key = distinct_key(input.value);
        if let Some(n) = self.freq.get_mut(&key) {
            *n -= 1;
            if *n == 0 {
                self.freq.remove(&key);
            }
        }
    }
}

/// Neumaier-compensated float total, so retracting a large input does not
/// wipe out the small ones still in the window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Compensated {
    sum: f64,
    compensation: f64,
}

impl Compensated {
    fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.compensation += (self.sum - t) + x;
        } else {
            self.compensation += (x - t) + self.sum;
        }
        self.sum = t;
    }

    fn merge(&self, other: &Self) -> Self {
        let mut merged = *self;
        merged.add(other.sum);
        merged.compensation += other.compensation;
        merged
    }

    fn total(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Integer inputs are summed exactly; the result stays an integer until a
/// float is in the window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sum {
    ints: i128,
    floats: Compensated,
    float_count: usize,
    n: usize,
}

impl Sum {
    fn total(&self) -> f64 {
        let mut total = self.floats;
        total.add(self.ints as f64);
        total.total()
    }

    fn count(&self) -> usize {
        self.n
    }
}

impl PartialAggregate for Sum {
    fn add(&mut self, input: Input<'_>) {
        match input.value {
            Value::Int(i) => self.ints += *i as i128,
            Value::Float(f) => {
                self.floats.add(*f);
                self.float_count += 1;
            }
            _ => return,
        }
        self.n += 1;
    }

    fn merge(&self, other: &Self) -> Self {
        Sum {
            ints: self.ints + other.ints,
            floats: self.floats.merge(&other.floats),
            float_count: self.float_count + other.float_count,
            n: self.n + other.n,
        }
    }

    fn evaluate(&self) -> Value {
        if self.n == 0 {
            return Value::Null;
        }
        if self.float_count == 0 {
            if let Ok(i) = i64::try_from(self.ints) {
                return Value::Int(i);
            }
        }
        Value::Float(self.total())
    }
}

impl SubtractPartialAggregate for Sum {
    fn subtract(&mut self, input: Input<'_>) {
        match input.value {
            Value::Int(i) => self.ints -= *i as i128,
            Value::Float(f) => {
                self.floats.add(-f);
                self.float_count -= 1;
                if self.float_count == 0 {
                    self.floats = Compensated::default();
                }
            }
            _ => return,
        }
        self.n -= 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mean {
    sum: Sum,
}

impl PartialAggregate for Mean {
    fn add(&mut self, input: Input<'_>) {
        self.sum.add(input);
    }

    fn merge(&self, other: &Self) -> Self {
        Mean {
            sum: self.sum.merge(&other.sum),
        }
    }

    fn evaluate(&self) -> Value {
        match self.sum.count() {
            0 => Value::Null,
            n => Value::Float(self.sum.total() / n as f64),
        }
    }
}

impl SubtractPartialAggregate for Mean {
    fn subtract(&mut self, input: Input<'_>) {
        self.sum.subtract(input);
    }
}

/// Sample variance, Welford's online algorithm
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variance {
    n: usize,
    mean: f64,
    m2: f64,
}

impl Variance {
    fn sample(&self) -> Option<f64> {
        if self.n < 2 {
            return None;
        }
        Some(self.m2.max(0.0) / (self.n - 1) as f64)
    }
}

impl PartialAggregate for Variance {
    fn add(&mut self, input: Input<'_>) {
        let Some(x) = input.value.as_f64() else {
            return;
        };
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Chan et al. pairwise combination
    fn merge(&self, other: &Self) -> Self {
        if self.n == 0 {
            return other.clone();
        }
        if other.n == 0 {
            return self.clone();
        }
        let n = self.n + other.n;
        let delta = other.mean - self.mean;
        let mean = self.mean + delta * other.n as f64 / n as f64;
        let m2 = self.m2 + other.m2 + delta * delta * (self.n * other.n) as f64 / n as f64;
        Variance { n, mean, m2 }
    }

    fn evaluate(&self) -> Value {
        self.sample().map(Value::Float).unwrap_or(Value::Null)
    }
}

impl SubtractPartialAggregate for Variance {
    fn subtract(&mut self, input: Input<'_>) {
        let Some(x) = input.value.as_f64() else {
            return;
        };
        if self.n <= 1 {
            *self = Variance::default();
            return;
        }
        let n = self.n as f64;
        let mean = (n * self.mean - x) / (n - 1.0);
        self.m2 -= (x - self.mean) * (x - mean);
        self.mean = mean;
        self.n -= 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StdDev {
    variance: Variance,
}

impl PartialAggregate for StdDev {
    fn add(&mut self, input: Input<'_>) {
        self.variance.add(input);
    }

    fn merge(&self, other: &Self) -> Self {
        StdDev {
            variance: self.variance.merge(&other.variance),
        }
    }

    fn evaluate(&self) -> Value {
        self.variance
            .sample()
            .map(|v| Value::Float(v.sqrt()))
            .unwrap_or(Value::Null)
    }
}

impl SubtractPartialAggregate for StdDev {
    fn subtract(&mut self, input: Input<'_>) {
        self.variance.subtract(input);
    }
}
