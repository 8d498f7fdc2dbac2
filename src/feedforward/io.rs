//! Text formats for networks and datasets.
//!
//! A network file looks like this:
//! ```text
//! CCNNET_FLO_1
//! network_type=0
//! connection_rate=1.0
//! num_layers=3
//! layer_sizes=2 3 1
//! neurons (num_inputs, activation_function, activation_steepness)=(0, 0, 1.0) ...
//! connections (connected_to_neuron, weight)=(0, 0.0123) ...
//! ```
//! Layer sizes exclude bias neurons, the neuron list includes them. Floats are written in
//! their shortest exact form, so a saved network loads back bit for bit.
//!
//! A dataset file starts with `num_patterns num_inputs num_outputs`, followed by the inputs
//! and the desired outputs of every pattern, each on its own line.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use super::activation::Activation;
use super::data::{DataError, TrainData};
use super::net::{self, Net, NetError, Neuron};
use super::params::NetType;

const NET_HEADER: &str = "CCNNET_FLO_1";
const NEURONS_KEY: &str = "neurons (num_inputs, activation_function, activation_steepness)";
const CONNECTIONS_KEY: &str = "connections (connected_to_neuron, weight)";

/// Error structure for saving and loading.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),
    #[error("Line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error(transparent)]
    Net(#[from] NetError),
    #[error(transparent)]
    Data(#[from] DataError),
}

fn parse_error(line: usize, reason: impl Into<String>) -> IoError {
    IoError::Parse {
        line,
        reason: reason.into(),
    }
}

fn parse_value<T>(text: &str, line: usize, what: &str) -> Result<T, IoError>
where
    T: FromStr,
    T::Err: Display,
{
    text.trim()
        .parse()
        .map_err(|e| parse_error(line, format!("bad {} {:?}: {}", what, text.trim(), e)))
}

/// Splits `(a, b) (c, d)` into `[[a, b], [c, d]]`.
fn tuples(text: &str, line: usize) -> Result<Vec<Vec<&str>>, IoError> {
    let mut result = Vec::new();
    for chunk in text.split(')') {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        if !chunk.starts_with('(') {
            return Err(parse_error(line, format!("expected a tuple, got {:?}", chunk)));
        }
        result.push(chunk[1..].split(',').map(str::trim).collect());
    }
    Ok(result)
}

fn join<T: std::fmt::Debug>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| format!("{:?}", v))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Net {
    /// Writes the network to `path`, replacing the file.
    ///
    /// # Examples
    /// ```no_run
    /// # use ccnnet::feedforward::Net;
    /// let net = Net::new(&[2, 3, 1], None).unwrap();
    /// net.save("xor.net").unwrap();
    /// let loaded = Net::load("xor.net").unwrap();
    /// assert_eq!(loaded.weights(), net.weights());
    /// ```
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads a network saved by `Net::save`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Net, IoError> {
        Net::read_from(BufReader::new(File::open(path)?))
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), IoError> {
        writeln!(writer, "{}", NET_HEADER)?;
        writeln!(writer, "network_type={}", self.net_type.code())?;
        writeln!(writer, "connection_rate={:?}", self.connection_rate)?;
        writeln!(writer, "num_layers={}", self.layers.len())?;
        writeln!(writer, "layer_sizes={}", join(&self.geometry()))?;

        let neurons: Vec<String> = self
            .neurons
            .iter()
            .map(|n| {
                format!(
                    "({}, {}, {:?})",
                    n.last_con - n.first_con,
                    n.activation.code(),
                    n.steepness
                )
            })
            .collect();
        writeln!(writer, "{}={}", NEURONS_KEY, neurons.join(" "))?;

        let connections: Vec<String> = self
            .sources
            .iter()
            .zip(&self.weights)
            .map(|(s, w)| format!("({}, {:?})", s, w))
            .collect();
        writeln!(writer, "{}={}", CONNECTIONS_KEY, connections.join(" "))?;
        Ok(())
    }

    pub fn read_from<R: BufRead>(reader: R) -> Result<Net, IoError> {
        let lines = reader.lines().collect::<Result<Vec<String>, _>>()?;
        match lines.first() {
            Some(header) if header.trim() == NET_HEADER => {}
            Some(header) => {
                return Err(parse_error(1, format!("unknown header {:?}", header.trim())))
            }
            None => return Err(parse_error(1, "empty file")),
        }

        // key -> (line number, value)
        let mut entries: HashMap<&str, (usize, &str)> = HashMap::new();
        for (i, line) in lines.iter().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            match line.find('=') {
                Some(at) => {
                    entries.insert(line[..at].trim(), (i + 1, &line[at + 1..]));
                }
                None => return Err(parse_error(i + 1, "expected key=value")),
            }
        }
        let end = lines.len() + 1;
        let entry = |key: &str| {
            entries
                .get(key)
                .copied()
                .ok_or_else(|| parse_error(end, format!("missing {:?}", key)))
        };

        let (line, value) = entry("network_type")?;
        let code: u32 = parse_value(value, line, "network type")?;
        let net_type = NetType::try_from(code)
            .map_err(|code| parse_error(line, format!("unknown network type {}", code)))?;

        let (line, value) = entry("connection_rate")?;
        let connection_rate: f64 = parse_value(value, line, "connection rate")?;

        let (line, value) = entry("num_layers")?;
        let num_layers: usize = parse_value(value, line, "layer count")?;

        let (line, value) = entry("layer_sizes")?;
        let geometry = value
            .split_whitespace()
            .map(|size| parse_value(size, line, "layer size"))
            .collect::<Result<Vec<usize>, _>>()?;
        if geometry.len() != num_layers {
            return Err(parse_error(
                line,
                format!("expected {} layer sizes, got {}", num_layers, geometry.len()),
            ));
        }
        // Bias neurons included, the arena can't be larger than this
        geometry
            .iter()
            .try_fold(geometry.len(), |sum, &size| sum.checked_add(size))
            .ok_or_else(|| parse_error(line, "layer sizes overflow"))?;
        let layers = net::layout(net_type, &geometry)?;
        let total = layers[layers.len() - 1].last;

        let (line, value) = entry(NEURONS_KEY)?;
        let descriptions = tuples(value, line)?;
        if descriptions.len() != total {
            return Err(parse_error(
                line,
                format!("expected {} neurons, got {}", total, descriptions.len()),
            ));
        }
        let mut neurons = Vec::with_capacity(total);
        let mut num_connections = 0;
        for fields in descriptions {
            if fields.len() != 3 {
                return Err(parse_error(line, "neurons are described by 3 values"));
            }
            let inputs: usize = parse_value(fields[0], line, "input count")?;
            let code: u32 = parse_value(fields[1], line, "activation function")?;
            let activation = Activation::try_from(code)
                .map_err(|code| parse_error(line, format!("unknown activation function {}", code)))?;
            let steepness: f64 = parse_value(fields[2], line, "steepness")?;

            let mut neuron = Neuron::new(activation, steepness);
            neuron.first_con = num_connections;
            num_connections = num_connections
                .checked_add(inputs)
                .ok_or_else(|| parse_error(line, "connection count overflows"))?;
            neuron.last_con = num_connections;
            neurons.push(neuron);
        }

        // Only non-bias neurons past the input layer may have inputs
        for (l, layer) in layers.iter().enumerate() {
            for n in layer.first..layer.last {
                let fed = l > 0 && layer.neurons().contains(&n);
                if !fed && !neurons[n].connections().is_empty() {
                    return Err(parse_error(line, format!("neuron {} can't have inputs", n)));
                }
            }
        }

        let (line, value) = entry(CONNECTIONS_KEY)?;
        let connections = tuples(value, line)?;
        if connections.len() != num_connections {
            return Err(parse_error(
                line,
                format!(
                    "expected {} connections, got {}",
                    num_connections,
                    connections.len()
                ),
            ));
        }
        let mut sources = Vec::with_capacity(num_connections);
        let mut weights = Vec::with_capacity(num_connections);
        for fields in connections {
            if fields.len() != 2 {
                return Err(parse_error(line, "connections are described by 2 values"));
            }
            sources.push(parse_value::<usize>(fields[0], line, "source neuron")?);
            weights.push(parse_value::<f64>(fields[1], line, "weight")?);
        }

        // Every connection must come from an earlier layer
        for (l, layer) in layers.iter().enumerate() {
            for n in layer.first..layer.last {
                for c in neurons[n].connections() {
                    if sources[c] >= layers[l].first {
                        return Err(parse_error(
                            line,
                            format!(
                                "neuron {} can't be fed by neuron {} of a later layer",
                                n, sources[c]
                            ),
                        ));
                    }
                }
            }
        }

        Ok(Net {
            net_type,
            connection_rate,
            layers,
            neurons,
            weights,
            sources,
        })
    }
}

impl TrainData {
    /// Writes the dataset to `path`, replacing the file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads a dataset saved by `TrainData::save`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<TrainData, IoError> {
        TrainData::read_from(BufReader::new(File::open(path)?))
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), IoError> {
        writeln!(
            writer,
            "{} {} {}",
            self.len(),
            self.num_input,
            self.num_output
        )?;
        for (inputs, outputs) in self.iter() {
            writeln!(writer, "{}", join(inputs))?;
            writeln!(writer, "{}", join(outputs))?;
        }
        Ok(())
    }

    /// Reads a dataset. Numbers may be separated by any whitespace, line breaks included.
    ///
    /// # Examples
    /// ```
    /// # use ccnnet::feedforward::TrainData;
    /// let text = "2 2 1\n0 1\n1\n1 1\n0\n";
    /// let data = TrainData::read_from(text.as_bytes()).unwrap();
    /// assert_eq!(data.len(), 2);
    /// assert_eq!(data.output(1), &[0.0]);
    /// ```
    pub fn read_from<R: BufRead>(reader: R) -> Result<TrainData, IoError> {
        let lines = reader.lines().collect::<Result<Vec<String>, _>>()?;
        let header = lines.first().ok_or_else(|| parse_error(1, "empty file"))?;
        let counts = header
            .split_whitespace()
            .map(|count| parse_value(count, 1, "count"))
            .collect::<Result<Vec<usize>, _>>()?;
        if counts.len() != 3 {
            return Err(parse_error(
                1,
                "expected header `num_patterns num_inputs num_outputs`",
            ));
        }
        let (patterns, num_input, num_output) = (counts[0], counts[1], counts[2]);

        let last_line = lines.len();
        let available: usize = lines[1..]
            .iter()
            .map(|line| line.split_whitespace().count())
            .sum();
        let needed = num_input
            .checked_add(num_output)
            .and_then(|width| width.checked_mul(patterns));
        match needed {
            Some(needed) if needed <= available => {}
            _ => {
                return Err(parse_error(
                    last_line,
                    format!(
                        "missing values: {} pattern(s) of {} input(s) and {} output(s) don't fit into {} value(s)",
                        patterns, num_input, num_output, available
                    ),
                ))
            }
        }

        let mut numbers = lines
            .iter()
            .enumerate()
            .skip(1)
            .flat_map(|(i, line)| line.split_whitespace().map(move |token| (i + 1, token)));
        let mut next = |what: &str| -> Result<f64, IoError> {
            match numbers.next() {
                Some((line, token)) => parse_value(token, line, what),
                None => Err(parse_error(last_line, format!("missing {}", what))),
            }
        };

        // Buffers are only sized once the values are known to be there
        let mut data = TrainData::new(num_input, num_output);
        for _ in 0..patterns {
            let inputs = (0..num_input)
                .map(|_| next("input"))
                .collect::<Result<Vec<f64>, _>>()?;
            let outputs = (0..num_output)
                .map(|_| next("output"))
                .collect::<Result<Vec<f64>, _>>()?;
            data.add(&inputs, &outputs)?;
        }

        if let Some((line, token)) = numbers.next() {
            return Err(parse_error(line, format!("unexpected trailing {:?}", token)));
        }
        Ok(data)
    }
}
