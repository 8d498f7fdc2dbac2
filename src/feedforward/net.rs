use rand::{distributions::Uniform, prelude::Distribution, Rng};
use std::ops::Range;
use thiserror::Error;

use super::activation::Activation;
use super::data::TrainData;
use super::params::NetType;
use super::trainer::Trainer;

/// Default activation function of hidden and output neurons.
pub const DEFAULT_ACTIVATION: Activation = Activation::SigmoidStepwise;
/// Default steepness of hidden and output neurons.
pub const DEFAULT_STEEPNESS: f64 = 0.5;

/// Weights are drawn from `[-DEFAULT_WEIGHT_RANGE, DEFAULT_WEIGHT_RANGE]` on construction.
const DEFAULT_WEIGHT_RANGE: f64 = 0.1;

/// A single neuron of the network arena.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Neuron {
    /// Range `[first_con, last_con)` of `Net::weights` and `Net::sources` holding the
    /// incoming connections of this neuron.
    pub(crate) first_con: usize,
    pub(crate) last_con: usize,
    pub(crate) activation: Activation,
    pub(crate) steepness: f64,
}

impl Neuron {
    pub(crate) fn new(activation: Activation, steepness: f64) -> Self {
        Neuron {
            first_con: 0,
            last_con: 0,
            activation,
            steepness,
        }
    }

    pub(crate) fn connections(&self) -> Range<usize> {
        self.first_con..self.last_con
    }
}

/// A layer is a range `[first, last)` of the neuron arena.
/// If the layer has a bias neuron, it is the last one of the range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Layer {
    pub(crate) first: usize,
    pub(crate) last: usize,
    pub(crate) bias: bool,
}

impl Layer {
    /// Number of neurons, bias excluded.
    pub(crate) fn len(&self) -> usize {
        self.last - self.first - self.bias as usize
    }

    /// Arena indices of the neurons, bias excluded.
    pub(crate) fn neurons(&self) -> Range<usize> {
        self.first..self.first + self.len()
    }

    pub(crate) fn bias_neuron(&self) -> Option<usize> {
        if self.bias {
            Some(self.last - 1)
        } else {
            None
        }
    }
}

/// Neural network structure.
///
/// All neurons of all layers live in a single arena:
/// `neurons = [layer_0][layer_1] ... [layer_N]`
/// `layer = [neuron_1][neuron_2] ... [neuron_K][bias]`
///
/// The input layer always ends with a bias neuron (constant output 1.0). In `Layer` networks
/// every hidden layer ends with one too, while in `Shortcut` networks all neurons take
/// their bias from the input layer. The output layer never has a bias neuron.
///
/// Connections are stored in two flat arrays, grouped by destination neuron:
/// `weights = [neuron_1 incoming][neuron_2 incoming] ...`
/// `sources = [neuron_1 sources][neuron_2 sources] ...`
/// Sources of every neuron are sorted by arena index.
#[derive(Clone, Debug, PartialEq)]
pub struct Net {
    pub(crate) net_type: NetType,
    pub(crate) connection_rate: f64,
    pub(crate) layers: Vec<Layer>,
    pub(crate) neurons: Vec<Neuron>,
    pub(crate) weights: Vec<f64>,
    pub(crate) sources: Vec<usize>,
}

/// Buffers holding the result of a forward pass: the scaled sum and the output of every
/// neuron of a network, indexed by arena position.
///
/// Passing this buffer explicitly keeps `Net::propagate` free of hidden shared state:
/// one network may be evaluated from many places at once, each with its own buffer.
#[derive(Clone, Debug, Default)]
pub struct Activations {
    pub(crate) sums: Vec<f64>,
    pub(crate) values: Vec<f64>,
}

impl Activations {
    /// Allocates buffers fitting `net`.
    pub fn new(net: &Net) -> Self {
        let mut activations = Activations::default();
        activations.fit(net);
        activations
    }

    /// Grows (or shrinks) the buffers to the number of neurons of `net`.
    pub(crate) fn fit(&mut self, net: &Net) {
        let total = net.neurons.len();
        self.sums.resize(total, 0.0);
        self.values.resize(total, 0.0);
    }

    /// Outputs of all neurons after the last forward pass.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// `steepness * sum` of all neurons after the last forward pass.
    pub fn sums(&self) -> &[f64] {
        &self.sums
    }
}

/// A connection, as reported by `Net::connections`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Connection {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
}

/// Places the layers of a network with the given geometry in the neuron arena.
///
/// The input layer always gets a bias neuron, hidden layers get one in `Layer` networks only.
pub(crate) fn layout(net_type: NetType, geometry: &[usize]) -> Result<Vec<Layer>, NetError> {
    if geometry.len() < 2 {
        return Err(NetError::BadGeometry(geometry.len()));
    }
    if let Some(empty) = geometry.iter().position(|&size| size == 0) {
        return Err(NetError::EmptyLayer(empty));
    }

    let last_layer = geometry.len() - 1;
    let mut layers = Vec::with_capacity(geometry.len());
    let mut first = 0;
    for (i, &size) in geometry.iter().enumerate() {
        let bias = i == 0 || (i < last_layer && net_type == NetType::Layer);
        let last = first + size + bias as usize;
        layers.push(Layer { first, last, bias });
        first = last;
    }
    Ok(layers)
}

impl Net {
    /// Returns a fully connected network (`NetType::Layer`) for the given geometry.
    ///
    /// # Arguments
    /// * `geometry` - number of neurons in each layer, input and output included;
    /// * `coefficients` - weights of all connections (optional), ordered like `Net::weights`.
    /// Random weights from [-0.1, 0.1] are used if none are given.
    ///
    /// # Returns
    /// * `Ok(Net)` if the geometry and the amount of coefficients are right;
    /// * `Err(NetError)` otherwise.
    ///
    /// # Examples
    /// * Using random coefficients
    /// ```
    /// # use ccnnet::feedforward::Net;
    /// let net = Net::new(&[10, 20, 20, 3], None).unwrap();
    /// assert_eq!(net.total_neurons(), 10 + 20 + 20 + 3 + 3);
    /// ```
    /// * Using given coefficients
    /// ```
    /// # use ccnnet::feedforward::Net;
    /// // Two inputs and a bias feeding one output
    /// let net = Net::new(&[2, 1], Some(Box::new([0.27, 0.3, 7.5]))).unwrap();
    /// assert_eq!(net.weights(), &[0.27, 0.3, 7.5]);
    /// ```
    pub fn new(geometry: &[usize], coefficients: Option<Box<[f64]>>) -> Result<Net, NetError> {
        let mut net = Net::assemble(NetType::Layer, 1.0, geometry, |sources| sources.to_vec())?;
        net.load_coefficients(coefficients)?;
        Ok(net)
    }

    /// Returns a shortcut network: every neuron is connected to all neurons of all previous
    /// layers, including a direct input to output connection.
    ///
    /// See `Net::new` for the arguments.
    ///
    /// # Examples
    /// ```
    /// # use ccnnet::feedforward::Net;
    /// let net = Net::shortcut(&[2, 3, 1], None).unwrap();
    /// // hidden: 3 * (2 + bias), output: 2 + 3 + bias
    /// assert_eq!(net.total_connections(), 9 + 6);
    /// ```
    pub fn shortcut(geometry: &[usize], coefficients: Option<Box<[f64]>>) -> Result<Net, NetError> {
        let mut net =
            Net::assemble(NetType::Shortcut, 1.0, geometry, |sources| sources.to_vec())?;
        net.load_coefficients(coefficients)?;
        Ok(net)
    }

    /// Returns a `NetType::Layer` network that is not fully connected.
    ///
    /// Every connection between neighbouring layers is kept with probability
    /// `connection_rate`, but each neuron keeps at least one incoming connection besides
    /// its bias. Weights are drawn from `rng` as well.
    ///
    /// # Arguments
    /// * `connection_rate` - value in (0, 1], where 1 gives a fully connected network;
    /// * `geometry` - number of neurons in each layer;
    /// * `rng` - source of randomness for both topology and weights.
    pub fn sparse<R: Rng + ?Sized>(
        connection_rate: f64,
        geometry: &[usize],
        rng: &mut R,
    ) -> Result<Net, NetError> {
        if !(connection_rate > 0.0 && connection_rate <= 1.0) {
            return Err(NetError::BadConnectionRate(connection_rate));
        }

        let mut net = Net::assemble(NetType::Layer, connection_rate, geometry, |sources| {
            let mut picked: Vec<usize> = sources
                .iter()
                .copied()
                .filter(|_| rng.gen_bool(connection_rate))
                .collect();
            if picked.is_empty() {
                picked.push(sources[rng.gen_range(0..sources.len())]);
            }
            picked
        })?;
        net.randomize_weights(rng, -DEFAULT_WEIGHT_RANGE, DEFAULT_WEIGHT_RANGE);
        Ok(net)
    }

    /// Lays out neurons and connections.
    ///
    /// # Arguments
    /// * `pick` - gets the candidate (non-bias) sources of a neuron and returns the ones
    /// to connect, in ascending order. The bias connection is always added.
    fn assemble<F>(
        net_type: NetType,
        connection_rate: f64,
        geometry: &[usize],
        mut pick: F,
    ) -> Result<Net, NetError>
    where
        F: FnMut(&[usize]) -> Vec<usize>,
    {
        let layers = layout(net_type, geometry)?;
        let mut neurons = Vec::with_capacity(layers[layers.len() - 1].last);
        for (i, layer) in layers.iter().enumerate() {
            let (activation, steepness) = if i == 0 {
                (Activation::Linear, 1.0)
            } else {
                (DEFAULT_ACTIVATION, DEFAULT_STEEPNESS)
            };
            neurons.extend(layer.neurons().map(|_| Neuron::new(activation, steepness)));
            if layer.bias {
                neurons.push(Neuron::new(Activation::Linear, 1.0));
            }
        }

        let mut sources = Vec::new();
        for l in 1..layers.len() {
            let (candidates, bias): (Vec<usize>, usize) = match net_type {
                NetType::Layer => (
                    layers[l - 1].neurons().collect(),
                    layers[l - 1].last - 1,
                ),
                NetType::Shortcut => (
                    layers[..l].iter().flat_map(|layer| layer.neurons()).collect(),
                    layers[0].last - 1,
                ),
            };

            for n in layers[l].neurons() {
                let mut incoming = pick(&candidates);
                incoming.push(bias);
                incoming.sort_unstable();

                neurons[n].first_con = sources.len();
                sources.extend(incoming);
                neurons[n].last_con = sources.len();
            }
        }

        Ok(Net {
            net_type,
            connection_rate,
            layers,
            neurons,
            weights: vec![0.0; sources.len()],
            sources,
        })
    }

    fn load_coefficients(&mut self, coefficients: Option<Box<[f64]>>) -> Result<(), NetError> {
        match coefficients {
            Some(coeffs) => self.set_weights(&coeffs),
            None => {
                let mut rng = rand::thread_rng();
                self.randomize_weights(&mut rng, -DEFAULT_WEIGHT_RANGE, DEFAULT_WEIGHT_RANGE);
                Ok(())
            }
        }
    }

    /// Number of neurons in each layer, bias neurons excluded.
    pub fn geometry(&self) -> Vec<usize> {
        self.layers.iter().map(Layer::len).collect()
    }

    pub fn net_type(&self) -> NetType {
        self.net_type
    }

    pub fn connection_rate(&self) -> f64 {
        self.connection_rate
    }

    pub fn num_input(&self) -> usize {
        self.layers[0].len()
    }

    pub fn num_output(&self) -> usize {
        self.output_layer().len()
    }

    /// Number of layers, input and output included.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Total number of neurons, bias neurons included.
    /// So, a 2-4-2 layered network has 2 + 4 + 2 + 2 (bias) = 10 neurons.
    pub fn total_neurons(&self) -> usize {
        self.neurons.len()
    }

    /// Number of hidden neurons, bias neurons excluded.
    pub fn num_hidden(&self) -> usize {
        self.layers[1..self.layers.len() - 1]
            .iter()
            .map(Layer::len)
            .sum()
    }

    pub fn total_connections(&self) -> usize {
        self.weights.len()
    }

    /// Weights of all connections, grouped by destination neuron.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Exports geometry and weights from network.
    ///
    /// # Returns
    /// `(geometry, weights)`.
    pub fn export(&self) -> (Vec<usize>, &[f64]) {
        (self.geometry(), &self.weights)
    }

    /// Replaces all weights.
    ///
    /// # Returns
    /// * `Ok(())` if `weights` has one value per connection;
    /// * `Err(NetError::BadCoefficients)` otherwise.
    pub fn set_weights(&mut self, weights: &[f64]) -> Result<(), NetError> {
        if weights.len() != self.weights.len() {
            return Err(NetError::BadCoefficients(SizeMismatch {
                expected: self.weights.len(),
                got: weights.len(),
            }));
        }
        self.weights.copy_from_slice(weights);
        Ok(())
    }

    /// Lists all connections as `(from, to, weight)`, using arena indices of the neurons.
    pub fn connections(&self) -> Vec<Connection> {
        let mut connections = Vec::with_capacity(self.weights.len());
        for (to, neuron) in self.neurons.iter().enumerate() {
            for c in neuron.connections() {
                connections.push(Connection {
                    from: self.sources[c],
                    to,
                    weight: self.weights[c],
                });
            }
        }
        connections
    }

    /// Gives each connection a random weight between `min_weight` and `max_weight`.
    /// The bounds may come in either order, but must be finite.
    pub fn randomize_weights<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        min_weight: f64,
        max_weight: f64,
    ) {
        let weights_between =
            Uniform::from(min_weight.min(max_weight)..=min_weight.max(max_weight));
        for w in self.weights.iter_mut() {
            *w = weights_between.sample(rng);
        }
    }

    /// Initializes weights with the Widrow-Nguyen algorithm, using the input range of `data`.
    ///
    /// Bias weights are drawn from `[-scale, scale]`, all other weights from `[0, scale]`, with
    /// `scale = (0.7 * hidden_neurons)^(1 / inputs) / (largest_input - smallest_input)`.
    /// Networks without hidden neurons therefore get all-zero weights.
    pub fn init_weights<R: Rng + ?Sized>(&mut self, data: &TrainData, rng: &mut R) {
        let span = match data.input_range() {
            Some((smallest, largest)) if largest > smallest => largest - smallest,
            _ => 1.0,
        };
        let scale =
            (0.7 * self.num_hidden() as f64).powf(1.0 / self.num_input() as f64) / span;

        for l in 1..self.layers.len() {
            let bias = match self.net_type {
                NetType::Layer => self.layers[l - 1].bias_neuron(),
                NetType::Shortcut => self.layers[0].bias_neuron(),
            };
            for n in self.layers[l].neurons() {
                for c in self.neurons[n].connections() {
                    self.weights[c] = if Some(self.sources[c]) == bias {
                        rng.gen_range(-scale..=scale)
                    } else {
                        rng.gen_range(0.0..=scale)
                    };
                }
            }
        }
    }

    /// Resolves `(layer, neuron)` into an arena index.
    /// The input layer and bias neurons have no activation function to speak of.
    fn neuron_index(&self, layer: usize, neuron: usize) -> Result<usize, NetError> {
        if layer == 0 || layer >= self.layers.len() || neuron >= self.layers[layer].len() {
            return Err(NetError::InvalidActivationIndex {
                layer,
                neuron: Some(neuron),
            });
        }
        Ok(self.layers[layer].first + neuron)
    }

    fn layer_neurons(&self, layer: usize) -> Result<Range<usize>, NetError> {
        if layer == 0 || layer >= self.layers.len() {
            return Err(NetError::InvalidActivationIndex {
                layer,
                neuron: None,
            });
        }
        Ok(self.layers[layer].neurons())
    }

    /// Returns the activation function of neuron `neuron` in layer `layer`, counting the
    /// input layer as layer 0.
    ///
    /// # Returns
    /// * `Err(NetError::InvalidActivationIndex)` for the input layer or a neuron that is not
    /// defined in the network.
    ///
    /// # Examples
    /// ```
    /// # use ccnnet::feedforward::{Activation, Net};
    /// let net = Net::new(&[2, 3, 1], None).unwrap();
    /// assert_eq!(net.activation_function(1, 2).unwrap(), Activation::SigmoidStepwise);
    /// assert!(net.activation_function(0, 0).is_err());
    /// ```
    pub fn activation_function(&self, layer: usize, neuron: usize) -> Result<Activation, NetError> {
        Ok(self.neurons[self.neuron_index(layer, neuron)?].activation)
    }

    /// Returns the activation steepness of neuron `neuron` in layer `layer`.
    /// Same indexing rules as `Net::activation_function`.
    pub fn activation_steepness(&self, layer: usize, neuron: usize) -> Result<f64, NetError> {
        Ok(self.neurons[self.neuron_index(layer, neuron)?].steepness)
    }

    /// Sets the activation function of one neuron, or of the whole layer if `neuron` is `None`.
    pub fn set_activation_function(
        &mut self,
        activation: Activation,
        layer: usize,
        neuron: Option<usize>,
    ) -> Result<(), NetError> {
        let range = match neuron {
            Some(neuron) => {
                let i = self.neuron_index(layer, neuron)?;
                i..i + 1
            }
            None => self.layer_neurons(layer)?,
        };
        for n in &mut self.neurons[range] {
            n.activation = activation;
        }
        Ok(())
    }

    /// Sets the activation steepness of one neuron, or of the whole layer if `neuron` is `None`.
    pub fn set_activation_steepness(
        &mut self,
        steepness: f64,
        layer: usize,
        neuron: Option<usize>,
    ) -> Result<(), NetError> {
        let range = match neuron {
            Some(neuron) => {
                let i = self.neuron_index(layer, neuron)?;
                i..i + 1
            }
            None => self.layer_neurons(layer)?,
        };
        for n in &mut self.neurons[range] {
            n.steepness = steepness;
        }
        Ok(())
    }

    /// Sets the activation function of all hidden neurons.
    pub fn set_activation_function_hidden(&mut self, activation: Activation) {
        for l in 1..self.layers.len() - 1 {
            for n in self.layers[l].neurons() {
                self.neurons[n].activation = activation;
            }
        }
    }

    /// Sets the activation function of all output neurons.
    pub fn set_activation_function_output(&mut self, activation: Activation) {
        for n in self.output_layer().neurons() {
            self.neurons[n].activation = activation;
        }
    }

    pub fn set_activation_steepness_hidden(&mut self, steepness: f64) {
        for l in 1..self.layers.len() - 1 {
            for n in self.layers[l].neurons() {
                self.neurons[n].steepness = steepness;
            }
        }
    }

    pub fn set_activation_steepness_output(&mut self, steepness: f64) {
        for n in self.output_layer().neurons() {
            self.neurons[n].steepness = steepness;
        }
    }

    pub(crate) fn output_layer(&self) -> Layer {
        self.layers[self.layers.len() - 1]
    }

    /// Range of `weights` holding the incoming connections of the output layer.
    pub(crate) fn output_connections(&self) -> Range<usize> {
        let output = self.output_layer();
        self.neurons[output.first].first_con..self.neurons[output.last - 1].last_con
    }

    /// Weighted sum of the inputs of `neuron`, given the outputs of all earlier neurons.
    pub(crate) fn weighted_sum(&self, neuron: &Neuron, values: &[f64]) -> f64 {
        let range = neuron.connections();
        self.weights[range.clone()]
            .iter()
            .zip(self.sources[range].iter())
            .map(|(w, &s)| w * values[s])
            .sum()
    }

    /// Calculates output of the network using given input, keeping the sums and outputs
    /// of all neurons in `activations` for later gradient computation.
    ///
    /// # Arguments
    /// * `inputs` - slice that holds activations of input neurons;
    /// * `activations` - forward pass buffers, resized to fit the network if needed.
    ///
    /// # Returns
    /// * `Ok(outputs)`, a slice of `activations` holding the output layer values;
    /// * `Err(NetError::DimensionMismatch)` if the amount of inputs is wrong.
    ///
    /// # Examples
    /// ```
    /// # use ccnnet::feedforward::{Activations, Net};
    /// let net = Net::new(&[10, 20, 20, 3], None).unwrap();
    /// let mut activations = Activations::new(&net);
    /// let outputs = net.propagate(&[1.0; 10], &mut activations).unwrap();
    /// assert_eq!(outputs.len(), 3);
    /// ```
    pub fn propagate<'a>(
        &self,
        inputs: &[f64],
        activations: &'a mut Activations,
    ) -> Result<&'a [f64], NetError> {
        let num_input = self.num_input();
        if inputs.len() != num_input {
            return Err(NetError::DimensionMismatch(SizeMismatch {
                expected: num_input,
                got: inputs.len(),
            }));
        }
        activations.fit(self);

        activations.values[..num_input].copy_from_slice(inputs);
        for layer in &self.layers {
            if let Some(bias) = layer.bias_neuron() {
                activations.sums[bias] = 1.0;
                activations.values[bias] = 1.0;
            }
        }

        for layer in &self.layers[1..] {
            for n in layer.neurons() {
                let neuron = &self.neurons[n];
                let sum = self.weighted_sum(neuron, &activations.values);
                let x = Activation::scaled_sum(neuron.steepness, sum);
                activations.sums[n] = x;
                activations.values[n] = neuron.activation.eval(x);
            }
        }

        let output = self.output_layer();
        Ok(&activations.values[output.first..output.last])
    }

    /// Runs `inputs` through the network using a temporary buffer.
    ///
    /// # Examples
    /// ```
    /// # use ccnnet::feedforward::Net;
    /// let net = Net::new(&[2, 1], Some(Box::new([0.0, 0.0, 0.0]))).unwrap();
    /// // Zero sum gives the middle of the sigmoid
    /// assert_eq!(net.run(&[1.0, -1.0]).unwrap(), vec![0.5]);
    /// ```
    pub fn run(&self, inputs: &[f64]) -> Result<Vec<f64>, NetError> {
        let mut activations = Activations::new(self);
        Ok(self.propagate(inputs, &mut activations)?.to_vec())
    }

    /// Inserts a new hidden layer holding a single neuron right before the output layer.
    ///
    /// The neuron gets a connection from every neuron before the output layer (bias
    /// included, in arena order) and a connection to every output neuron. Existing
    /// connections are kept untouched.
    ///
    /// # Arguments
    /// * `in_weights` - one weight per neuron before the output layer;
    /// * `out_weights` - one weight per output neuron.
    ///
    /// # Returns
    /// * `Ok(index)` - arena index of the new neuron;
    /// * `Err(NetError)` if the network is not a shortcut network or the weights don't fit.
    pub(crate) fn insert_hidden_neuron(
        &mut self,
        activation: Activation,
        steepness: f64,
        in_weights: &[f64],
        out_weights: &[f64],
    ) -> Result<usize, NetError> {
        if self.net_type != NetType::Shortcut {
            return Err(NetError::NotShortcut);
        }
        let output_index = self.layers.len() - 1;
        let output = self.layers[output_index];
        if in_weights.len() != output.first {
            return Err(NetError::BadCoefficients(SizeMismatch {
                expected: output.first,
                got: in_weights.len(),
            }));
        }
        if out_weights.len() != output.len() {
            return Err(NetError::BadCoefficients(SizeMismatch {
                expected: output.len(),
                got: out_weights.len(),
            }));
        }

        let kept = self.neurons[output.first].first_con;
        let total = self.weights.len() + in_weights.len() + out_weights.len();
        let mut weights = Vec::with_capacity(total);
        let mut sources = Vec::with_capacity(total);
        weights.extend_from_slice(&self.weights[..kept]);
        sources.extend_from_slice(&self.sources[..kept]);

        let mut candidate = Neuron::new(activation, steepness);
        candidate.first_con = weights.len();
        weights.extend_from_slice(in_weights);
        sources.extend(0..output.first);
        candidate.last_con = weights.len();

        // Outputs are never sources, so their connections just move and grow by one
        let mut outputs = Vec::with_capacity(output.len());
        for (neuron, &out_weight) in self.neurons[output.first..].iter().zip(out_weights) {
            let mut moved = neuron.clone();
            moved.first_con = weights.len();
            weights.extend_from_slice(&self.weights[neuron.connections()]);
            sources.extend_from_slice(&self.sources[neuron.connections()]);
            weights.push(out_weight);
            sources.push(output.first);
            moved.last_con = weights.len();
            outputs.push(moved);
        }

        self.neurons.truncate(output.first);
        self.neurons.push(candidate);
        self.neurons.extend(outputs);
        self.weights = weights;
        self.sources = sources;

        self.layers.insert(
            output_index,
            Layer {
                first: output.first,
                last: output.first + 1,
                bias: false,
            },
        );
        let output = &mut self.layers[output_index + 1];
        output.first += 1;
        output.last += 1;

        Ok(output.first - 1)
    }

    /// Consumes `Net` and builds `Trainer` object containing it, with default parameters.
    /// See `Trainer`'s documentation for details.
    pub fn build_trainer(self) -> Trainer {
        Trainer::new(self, Default::default())
    }
}

/// Error structure for network construction, inspection and propagation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetError {
    #[error("Net must have at least two layers (input and output), but got geometry with len {0}!")]
    BadGeometry(usize),
    #[error("Every layer must have at least one neuron, but layer {0} is empty!")]
    EmptyLayer(usize),
    #[error("Expected {} coefficients because of provided geometry, but got {}!", .0.expected, .0.got)]
    BadCoefficients(SizeMismatch),
    #[error("Connection rate must be in (0, 1], but got {0}!")]
    BadConnectionRate(f64),
    #[error("Expected {} input(s), but got {}!", .0.expected, .0.got)]
    DimensionMismatch(SizeMismatch),
    #[error(
        "Neuron ({}, {}) is not defined in the network!",
        .layer,
        .neuron.map_or_else(|| "*".to_owned(), |n| n.to_string())
    )]
    InvalidActivationIndex { layer: usize, neuron: Option<usize> },
    #[error("Only shortcut networks can grow hidden neurons!")]
    NotShortcut,
}

/// Error structure for collections size mismatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Expected {expected} values, but got {got}!")]
pub struct SizeMismatch {
    pub expected: usize,
    pub got: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn layer_of(net: &Net, neuron: usize) -> usize {
        net.layers
            .iter()
            .position(|layer| (layer.first..layer.last).contains(&neuron))
            .unwrap()
    }

    fn assert_feedforward(net: &Net) {
        for c in net.connections() {
            assert!(layer_of(net, c.from) < layer_of(net, c.to));
        }
    }

    #[test]
    fn layer_geometry() {
        let net = Net::new(&[2, 4, 2], None).unwrap();
        assert_eq!(net.geometry(), vec![2, 4, 2]);
        assert_eq!(net.total_neurons(), 10);
        assert_eq!(net.total_connections(), 4 * 3 + 2 * 5);
        assert_eq!(net.num_hidden(), 4);
        assert_feedforward(&net);
    }

    #[test]
    fn shortcut_geometry() {
        let net = Net::shortcut(&[2, 3, 2], None).unwrap();
        // Only the input layer has a bias neuron
        assert_eq!(net.total_neurons(), 2 + 1 + 3 + 2);
        assert_eq!(net.total_connections(), 3 * 3 + 2 * 6);
        assert_feedforward(&net);
        for c in net.connections() {
            assert!(c.from != 2 || layer_of(&net, c.to) > 0);
        }
    }

    #[test]
    fn bad_geometry() {
        assert_eq!(Net::new(&[3], None), Err(NetError::BadGeometry(1)));
        assert_eq!(Net::new(&[3, 0, 1], None), Err(NetError::EmptyLayer(1)));
        assert_eq!(
            Net::new(&[2, 1], Some(Box::new([1.0]))),
            Err(NetError::BadCoefficients(SizeMismatch {
                expected: 3,
                got: 1
            }))
        );
    }

    #[test]
    fn propagate_by_hand() {
        // inputs (a, b), bias; output = linear(0.5 * (2a - b + 0.5))
        let mut net = Net::new(&[2, 1], Some(Box::new([2.0, -1.0, 0.5]))).unwrap();
        net.set_activation_function_output(Activation::Linear);
        net.set_activation_steepness_output(0.5);
        let out = net.run(&[1.0, 3.0]).unwrap();
        assert_relative_eq!(out[0], 0.5 * (2.0 - 3.0 + 0.5));
    }

    #[test]
    fn propagate_is_deterministic() {
        let net = Net::shortcut(&[3, 4, 2], None).unwrap();
        let input = [0.1, -0.7, 0.3];
        let mut activations = Activations::new(&net);
        let first = net.propagate(&input, &mut activations).unwrap().to_vec();
        let second = net.run(&input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn propagate_wrong_inputs() {
        let net = Net::new(&[3, 1], None).unwrap();
        assert_eq!(
            net.run(&[1.0]),
            Err(NetError::DimensionMismatch(SizeMismatch {
                expected: 3,
                got: 1
            }))
        );
    }

    #[test]
    fn activation_indices() {
        let mut net = Net::new(&[2, 3, 1], None).unwrap();
        for neuron in 0..3 {
            assert_eq!(
                net.activation_function(0, neuron),
                Err(NetError::InvalidActivationIndex {
                    layer: 0,
                    neuron: Some(neuron)
                })
            );
        }
        assert!(net.activation_function(1, 3).is_err());
        assert!(net.activation_steepness(3, 0).is_err());
        assert!(net.set_activation_function(Activation::Linear, 0, None).is_err());

        net.set_activation_function(Activation::Elliot, 1, Some(1)).unwrap();
        net.set_activation_steepness(0.9, 2, None).unwrap();
        assert_eq!(net.activation_function(1, 1).unwrap(), Activation::Elliot);
        assert_eq!(net.activation_function(1, 0).unwrap(), DEFAULT_ACTIVATION);
        assert_eq!(net.activation_steepness(2, 0).unwrap(), 0.9);
    }

    #[test]
    fn sparse_has_fewer_connections() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let full = Net::new(&[6, 8, 3], None).unwrap();
        let sparse = Net::sparse(0.5, &[6, 8, 3], &mut rng).unwrap();
        assert!(sparse.total_connections() <= full.total_connections());
        assert_eq!(sparse.connection_rate(), 0.5);
        assert_feedforward(&sparse);
        for layer in &sparse.layers[1..] {
            for n in layer.neurons() {
                // bias and at least one real source
                assert!(sparse.neurons[n].connections().len() >= 2);
            }
        }
        assert_eq!(
            Net::sparse(0.0, &[2, 1], &mut rng),
            Err(NetError::BadConnectionRate(0.0))
        );
    }

    #[test]
    fn randomize_accepts_swapped_bounds() {
        let mut net = Net::new(&[3, 4, 2], None).unwrap();
        net.randomize_weights(&mut ChaCha8Rng::seed_from_u64(6), 0.5, -0.5);
        assert!(net.weights().iter().all(|w| (-0.5..=0.5).contains(w)));
        assert!(net.weights().iter().any(|&w| w != 0.0));
    }

    #[test]
    fn widrow_nguyen_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let data = TrainData::from_pairs(vec![
            (vec![0.0, 0.0], vec![0.0]),
            (vec![2.0, 1.0], vec![1.0]),
        ])
        .unwrap();
        let mut net = Net::new(&[2, 4, 1], None).unwrap();
        net.init_weights(&data, &mut rng);
        let scale = (0.7f64 * 4.0).powf(0.5) / 2.0;
        for c in net.connections() {
            if c.from == 2 || c.from == 7 {
                assert!(c.weight.abs() <= scale);
            } else {
                assert!(c.weight >= 0.0 && c.weight <= scale);
            }
        }
    }

    #[test]
    fn insert_hidden_neuron_grows_by_one() {
        let mut net = Net::shortcut(&[2, 2], Some(Box::new([0.1; 6]))).unwrap();
        let before = net.total_neurons();
        let index = net
            .insert_hidden_neuron(Activation::Sigmoid, 0.5, &[0.3, -0.2, 0.1], &[0.7, -0.7])
            .unwrap();
        assert_eq!(index, 3);
        assert_eq!(net.total_neurons(), before + 1);
        assert_eq!(net.geometry(), vec![2, 1, 2]);
        assert_eq!(net.total_connections(), 6 + 3 + 2);
        assert_eq!(net.activation_function(1, 0).unwrap(), Activation::Sigmoid);
        assert_feedforward(&net);

        // Output neurons keep their old connections and gain the new one last
        let conns = net.connections();
        let to_first_output: Vec<_> = conns.iter().filter(|c| c.to == 4).collect();
        assert_eq!(to_first_output.len(), 4);
        assert_eq!(to_first_output[3].from, 3);
        assert_relative_eq!(to_first_output[3].weight, 0.7);

        let mut layered = Net::new(&[2, 1], None).unwrap();
        assert_eq!(
            layered.insert_hidden_neuron(Activation::Sigmoid, 0.5, &[0.0; 3], &[0.0]),
            Err(NetError::NotShortcut)
        );
    }
}
