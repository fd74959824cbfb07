use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use bincode::{deserialize, serialize};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use rand_distr::Uniform;
use ndarray_rand::RandomExt;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::approximator::QFunction;
use crate::error::{DdqnError, Result};
use crate::loss::LossFunction;
use crate::optimizer::{Adam, GradientClipper, Optimizer, OptimizerWrapper};

/// A fully connected layer: `activation(inputs . weights + biases)`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
}

impl DenseLayer {
    /// Create a new layer with He-uniform weights (`limit = sqrt(6 / fan_in)`)
    /// and zero biases.
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, activation: Activation, rng: &mut R) -> Self {
        let limit = (6.0 / input_size.max(1) as f32).sqrt();
        let weights = Array2::random_using((input_size, output_size), Uniform::new_inclusive(-limit, limit), rng);
        let biases = Array1::zeros(output_size);
        DenseLayer { weights, biases, activation }
    }

    /// Build a layer from explicit parameters.
    pub fn from_parts(weights: Array2<f32>, biases: Array1<f32>, activation: Activation) -> Result<Self> {
        if weights.ncols() != biases.len() {
            return Err(DdqnError::dimension_mismatch(
                format!("{} biases", weights.ncols()),
                format!("{} biases", biases.len()),
            ));
        }
        Ok(DenseLayer { weights, biases, activation })
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    fn pre_activation(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        inputs.dot(&self.weights) + &self.biases
    }
}

/// Parameter snapshot of a [`NeuralNetwork`]: `(weights, biases)` per layer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NetworkWeights {
    pub layers: Vec<(Array2<f32>, Array1<f32>)>,
}

/// Everything recorded during a forward pass that backpropagation needs.
struct ForwardTrace {
    inputs: Vec<Array2<f32>>,
    pre_activations: Vec<Array2<f32>>,
    output: Array2<f32>,
}

/// A feed-forward value network trained by minibatch regression.
///
/// The network owns its optimizer state, learning rate and gradient clipping
/// policy, so a training step needs nothing beyond states and targets.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NeuralNetwork {
    pub layers: Vec<DenseLayer>,
    pub optimizer: OptimizerWrapper,
    pub learning_rate: f32,
    pub clipper: GradientClipper,
    pub loss: LossFunction,
}

impl NeuralNetwork {
    /// Create a new neural network with the given layer sizes and activations.
    ///
    /// `layer_sizes` includes the input width and the output width, so it must
    /// have exactly one more entry than `activations`.
    pub fn new<R: Rng + ?Sized>(
        layer_sizes: &[usize],
        activations: &[Activation],
        optimizer: OptimizerWrapper,
        learning_rate: f32,
        rng: &mut R,
    ) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(DdqnError::invalid_parameter("layer_sizes", "must have at least 2 entries"));
        }
        if layer_sizes.iter().any(|&size| size == 0) {
            return Err(DdqnError::invalid_parameter("layer_sizes", "every layer needs at least one unit"));
        }
        if activations.len() != layer_sizes.len() - 1 {
            return Err(DdqnError::invalid_parameter(
                "activations".to_string(),
                format!("expected {} activations, got {}", layer_sizes.len() - 1, activations.len()),
            ));
        }
        if !(learning_rate > 0.0) {
            return Err(DdqnError::invalid_parameter("learning_rate", "must be positive"));
        }

        let layers = layer_sizes
            .windows(2)
            .zip(activations.iter())
            .map(|(window, &activation)| DenseLayer::new(window[0], window[1], activation, rng))
            .collect();

        Ok(NeuralNetwork {
            layers,
            optimizer,
            learning_rate,
            clipper: GradientClipper::None,
            loss: LossFunction::MeanSquared,
        })
    }

    /// `input -> 32 -> 64 -> num_actions` with ReLU hidden layers, Adam and
    /// gradients clipped to `[-10, 10]`.
    pub fn q_network<R: Rng + ?Sized>(input_size: usize, num_actions: usize, learning_rate: f32, rng: &mut R) -> Result<Self> {
        let network = Self::new(
            &[input_size, 32, 64, num_actions],
            &[Activation::Relu, Activation::Relu, Activation::Linear],
            OptimizerWrapper::Adam(Adam::default()),
            learning_rate,
            rng,
        )?;
        Ok(network.with_clipper(GradientClipper::by_value(10.0)))
    }

    pub fn with_clipper(mut self, clipper: GradientClipper) -> Self {
        self.clipper = clipper;
        self
    }

    pub fn with_loss(mut self, loss: LossFunction) -> Self {
        self.loss = loss;
        self
    }

    pub fn with_layers(mut self, layers: Vec<DenseLayer>) -> Self {
        self.layers = layers;
        self
    }

    /// Forward pass for a batch of input vectors.
    pub fn forward_batch(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_input(inputs)?;
        let mut current = inputs.to_owned();
        for layer in &self.layers {
            let mut outputs = layer.pre_activation(current.view());
            layer.activation.apply_batch(&mut outputs);
            current = outputs;
        }
        Ok(current)
    }

    fn forward_trace(&self, inputs: ArrayView2<f32>) -> ForwardTrace {
        let mut layer_inputs = Vec::with_capacity(self.layers.len());
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        let mut current = inputs.to_owned();
        for layer in &self.layers {
            let pre = layer.pre_activation(current.view());
            let mut outputs = pre.clone();
            layer.activation.apply_batch(&mut outputs);
            layer_inputs.push(current);
            pre_activations.push(pre);
            current = outputs;
        }
        ForwardTrace {
            inputs: layer_inputs,
            pre_activations,
            output: current,
        }
    }

    /// Backpropagate `output_errors` (dLoss/dOutput) through the recorded pass.
    fn backward(&self, trace: &ForwardTrace, output_errors: Array2<f32>) -> Vec<(Array2<f32>, Array1<f32>)> {
        let mut gradients = Vec::with_capacity(self.layers.len());
        let mut current_error = output_errors;

        for i in (0..self.layers.len()).rev() {
            let layer = &self.layers[i];
            let delta = &current_error * &layer.activation.derivative_batch(trace.pre_activations[i].view());
            let weight_gradients = trace.inputs[i].t().dot(&delta);
            let bias_gradients = delta.sum_axis(Axis(0));
            if i != 0 {
                current_error = delta.dot(&layer.weights.t());
            }
            gradients.push((weight_gradients, bias_gradients));
        }

        gradients.reverse();
        gradients
    }

    /// One gradient step on a batch; returns the loss measured before the update.
    pub fn train_minibatch(&mut self, inputs: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<f32> {
        self.check_input(inputs)?;
        let expected = (inputs.nrows(), self.output_size());
        if targets.dim() != expected {
            return Err(DdqnError::dimension_mismatch(
                format!("targets of shape {:?}", expected),
                format!("targets of shape {:?}", targets.dim()),
            ));
        }

        let trace = self.forward_trace(inputs);
        let loss = self.loss.compute(trace.output.view(), targets);
        if !loss.is_finite() {
            return Err(DdqnError::Numerical(format!("non-finite training loss {}", loss)));
        }

        let output_errors = self.loss.gradient(trace.output.view(), targets);
        let gradients = self.backward(&trace, output_errors);

        let learning_rate = self.learning_rate;
        for (idx, (layer, (mut weight_gradients, mut bias_gradients))) in self.layers.iter_mut().zip(gradients).enumerate() {
            self.clipper.clip_weights(&mut weight_gradients);
            self.clipper.clip_biases(&mut bias_gradients);
            self.optimizer.update_weights(idx, &mut layer.weights, &weight_gradients, learning_rate);
            self.optimizer.update_biases(idx, &mut layer.biases, &bias_gradients, learning_rate);
        }
        self.optimizer.step();

        Ok(loss)
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(DenseLayer::input_size).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(DenseLayer::output_size).unwrap_or(0)
    }

    fn check_input(&self, inputs: ArrayView2<f32>) -> Result<()> {
        if inputs.ncols() != self.input_size() {
            return Err(DdqnError::dimension_mismatch(
                format!("inputs with {} columns", self.input_size()),
                format!("inputs with {} columns", inputs.ncols()),
            ));
        }
        Ok(())
    }

    /// Save the network, optimizer state included, as bincode.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serialize(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(&serialized)?;
        Ok(())
    }

    /// Load a network written by [`NeuralNetwork::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = fs::File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(deserialize(&buffer)?)
    }
}

impl QFunction for NeuralNetwork {
    type Weights = NetworkWeights;

    fn input_size(&self) -> usize {
        NeuralNetwork::input_size(self)
    }

    fn num_actions(&self) -> usize {
        self.output_size()
    }

    fn predict(&self, states: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.forward_batch(states)
    }

    fn train_on_batch(&mut self, states: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<f32> {
        self.train_minibatch(states, targets)
    }

    fn get_weights(&self) -> NetworkWeights {
        NetworkWeights {
            layers: self
                .layers
                .iter()
                .map(|layer| (layer.weights.clone(), layer.biases.clone()))
                .collect(),
        }
    }

    /// Replaces every layer's parameters. Optimizer state is left as is.
    fn set_weights(&mut self, weights: NetworkWeights) -> Result<()> {
        if weights.layers.len() != self.layers.len() {
            return Err(DdqnError::dimension_mismatch(
                format!("{} layers", self.layers.len()),
                format!("{} layers", weights.layers.len()),
            ));
        }
        for (layer, (w, b)) in self.layers.iter().zip(&weights.layers) {
            if w.dim() != layer.weights.dim() || b.len() != layer.biases.len() {
                return Err(DdqnError::dimension_mismatch(
                    format!("layer of shape {:?}", layer.weights.dim()),
                    format!("layer of shape {:?}", w.dim()),
                ));
            }
        }
        for (layer, (w, b)) in self.layers.iter_mut().zip(weights.layers) {
            layer.weights = w;
            layer.biases = b;
        }
        Ok(())
    }
}
