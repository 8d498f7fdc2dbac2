use rand::{seq::SliceRandom, Rng};
use thiserror::Error;

use super::net::{Net, SizeMismatch};

/// Training set: a list of `(inputs, desired outputs)` patterns of fixed arity.
///
/// Samples are kept joined, like the buffers `Trainer` used to take:
/// `inputs = [sample_1 inputs][sample_2 inputs] ...`
/// `outputs = [sample_1 outputs][sample_2 outputs] ...`
#[derive(Clone, Debug, PartialEq)]
pub struct TrainData {
    pub(crate) num_input: usize,
    pub(crate) num_output: usize,
    pub(crate) inputs: Vec<f64>,
    pub(crate) outputs: Vec<f64>,
}

impl TrainData {
    /// Returns an empty dataset for patterns with `num_input` inputs and `num_output` outputs.
    pub fn new(num_input: usize, num_output: usize) -> TrainData {
        TrainData {
            num_input,
            num_output,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Builds a dataset out of `(inputs, desired outputs)` pairs.
    /// The arity is taken from the first pair.
    ///
    /// # Returns
    /// * `Err(DataError)` if the pairs disagree on their arity, or if there are none.
    ///
    /// # Examples
    /// ```
    /// # use ccnnet::feedforward::TrainData;
    /// let data = TrainData::from_pairs(vec![
    ///     (vec![0.0, 1.0], vec![1.0]),
    ///     (vec![1.0, 1.0], vec![0.0]),
    /// ])
    /// .unwrap();
    /// assert_eq!(data.len(), 2);
    /// assert_eq!(data.input(1), &[1.0, 1.0]);
    /// ```
    pub fn from_pairs(pairs: Vec<(Vec<f64>, Vec<f64>)>) -> Result<TrainData, DataError> {
        let (num_input, num_output) = match pairs.first() {
            Some((inputs, outputs)) => (inputs.len(), outputs.len()),
            None => return Err(DataError::Empty),
        };
        let mut data = TrainData::new(num_input, num_output);
        for (inputs, outputs) in pairs {
            data.add(&inputs, &outputs)?;
        }
        Ok(data)
    }

    /// Appends a pattern.
    pub fn add(&mut self, inputs: &[f64], outputs: &[f64]) -> Result<(), DataError> {
        if inputs.len() != self.num_input {
            return Err(DataError::WrongSampleInputsCount {
                sample: self.len(),
                expected: self.num_input,
                got: inputs.len(),
            });
        }
        if outputs.len() != self.num_output {
            return Err(DataError::WrongSampleDesiredOutputsCount {
                sample: self.len(),
                expected: self.num_output,
                got: outputs.len(),
            });
        }
        self.inputs.extend_from_slice(inputs);
        self.outputs.extend_from_slice(outputs);
        Ok(())
    }

    pub fn num_input(&self) -> usize {
        self.num_input
    }

    pub fn num_output(&self) -> usize {
        self.num_output
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        if self.num_input > 0 {
            self.inputs.len() / self.num_input
        } else if self.num_output > 0 {
            self.outputs.len() / self.num_output
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inputs of pattern `i`. Panics if `i` is out of range, like slice indexing does.
    pub fn input(&self, i: usize) -> &[f64] {
        &self.inputs[i * self.num_input..(i + 1) * self.num_input]
    }

    /// Desired outputs of pattern `i`.
    pub fn output(&self, i: usize) -> &[f64] {
        &self.outputs[i * self.num_output..(i + 1) * self.num_output]
    }

    /// Iterates over `(inputs, desired outputs)` of all patterns.
    pub fn iter(&self) -> impl Iterator<Item = (&[f64], &[f64])> + '_ {
        (0..self.len()).map(move |i| (self.input(i), self.output(i)))
    }

    /// Smallest and largest input value, if there is any input at all.
    pub fn input_range(&self) -> Option<(f64, f64)> {
        range_of(&self.inputs)
    }

    /// Smallest and largest desired output value.
    pub fn output_range(&self) -> Option<(f64, f64)> {
        range_of(&self.outputs)
    }

    /// Shuffles pattern order, keeping inputs and outputs paired.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);

        let mut inputs = Vec::with_capacity(self.inputs.len());
        let mut outputs = Vec::with_capacity(self.outputs.len());
        for &i in &order {
            inputs.extend_from_slice(self.input(i));
            outputs.extend_from_slice(self.output(i));
        }
        self.inputs = inputs;
        self.outputs = outputs;
    }

    /// Returns a new dataset holding the patterns of `self` followed by the ones of `other`.
    pub fn merge(&self, other: &TrainData) -> Result<TrainData, DataError> {
        if other.num_input != self.num_input {
            return Err(DataError::Incompatible(SizeMismatch {
                expected: self.num_input,
                got: other.num_input,
            }));
        }
        if other.num_output != self.num_output {
            return Err(DataError::Incompatible(SizeMismatch {
                expected: self.num_output,
                got: other.num_output,
            }));
        }
        let mut merged = self.clone();
        merged.inputs.extend_from_slice(&other.inputs);
        merged.outputs.extend_from_slice(&other.outputs);
        Ok(merged)
    }

    /// Returns a copy of `len` patterns starting at `pos`.
    pub fn subset(&self, pos: usize, len: usize) -> Result<TrainData, DataError> {
        if pos.checked_add(len).map_or(true, |end| end > self.len()) {
            return Err(DataError::BadSubset {
                pos,
                len,
                total: self.len(),
            });
        }
        Ok(TrainData {
            num_input: self.num_input,
            num_output: self.num_output,
            inputs: self.inputs[pos * self.num_input..(pos + len) * self.num_input].to_vec(),
            outputs: self.outputs[pos * self.num_output..(pos + len) * self.num_output].to_vec(),
        })
    }

    /// Checks that the patterns fit the inputs and outputs of `net`.
    pub(crate) fn check_fits(&self, net: &Net) -> Result<(), SizeMismatch> {
        if self.num_input != net.num_input() {
            return Err(SizeMismatch {
                expected: net.num_input(),
                got: self.num_input,
            });
        }
        if self.num_output != net.num_output() {
            return Err(SizeMismatch {
                expected: net.num_output(),
                got: self.num_output,
            });
        }
        Ok(())
    }
}

fn range_of(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(min, max), &v| (min.min(v), max.max(v))),
    )
}

/// Error structure for dataset construction and shaping.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("Expected {expected} input(s), but samples[{sample}] got {got}!")]
    WrongSampleInputsCount {
        sample: usize,
        expected: usize,
        got: usize,
    },
    #[error("Expected {expected} desired output(s), but samples[{sample}] got {got}!")]
    WrongSampleDesiredOutputsCount {
        sample: usize,
        expected: usize,
        got: usize,
    },
    #[error("Datasets don't match: expected arity {}, but got {}!", .0.expected, .0.got)]
    Incompatible(SizeMismatch),
    #[error("Subset of {len} pattern(s) at {pos} doesn't fit into {total} pattern(s)!")]
    BadSubset { pos: usize, len: usize, total: usize },
    #[error("Dataset must have at least one pattern!")]
    Empty,
}
