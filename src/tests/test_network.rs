use ndarray::{array, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

use crate::activations::Activation;
use crate::approximator::{argmax, QFunction};
use crate::error::DdqnError;
use crate::network::{DenseLayer, NeuralNetwork};
use crate::optimizer::{Adam, GradientClipper, OptimizerWrapper, SGD};

fn small_network(seed: u64) -> NeuralNetwork {
    let mut rng = StdRng::seed_from_u64(seed);
    NeuralNetwork::new(
        &[2, 8, 2],
        &[Activation::Relu, Activation::Linear],
        OptimizerWrapper::Adam(Adam::default()),
        0.01,
        &mut rng,
    )
    .unwrap()
}

#[test]
fn test_q_network_architecture() {
    let mut rng = StdRng::seed_from_u64(0);
    let network = NeuralNetwork::q_network(4, 2, 0.0015, &mut rng).unwrap();
    let shapes: Vec<_> = network.layers.iter().map(|l| l.weights.dim()).collect();
    assert_eq!(shapes, vec![(4, 32), (32, 64), (64, 2)]);
    assert_eq!(network.clipper, GradientClipper::by_value(10.0));
    assert_eq!(QFunction::input_size(&network), 4);
    assert_eq!(network.num_actions(), 2);
}

#[test]
fn test_construction_errors() {
    let mut rng = StdRng::seed_from_u64(0);
    let sgd = || OptimizerWrapper::SGD(SGD::new());
    assert!(NeuralNetwork::new(&[4], &[], sgd(), 0.1, &mut rng).is_err());
    assert!(NeuralNetwork::new(&[4, 0, 2], &[Activation::Relu, Activation::Linear], sgd(), 0.1, &mut rng).is_err());
    assert!(NeuralNetwork::new(&[4, 2], &[Activation::Relu, Activation::Linear], sgd(), 0.1, &mut rng).is_err());
    assert!(NeuralNetwork::new(&[4, 2], &[Activation::Linear], sgd(), 0.0, &mut rng).is_err());
}

#[test]
fn test_predict_shape_and_width_check() {
    let network = small_network(1);
    let out = network.predict(Array2::zeros((5, 2)).view()).unwrap();
    assert_eq!(out.dim(), (5, 2));

    let err = network.predict(Array2::zeros((5, 3)).view()).unwrap_err();
    assert!(matches!(err, DdqnError::DimensionMismatch { .. }));
}

#[test]
fn test_known_weights_forward() {
    let layer = DenseLayer::from_parts(array![[1.0, -1.0], [2.0, 0.5]], array![0.5, 0.0], Activation::Relu).unwrap();
    let network = small_network(0).with_layers(vec![layer]);
    let out = network.forward_batch(array![[1.0, 1.0], [-1.0, 0.0]].view()).unwrap();
    assert_eq!(out, array![[3.5, 0.0], [0.0, 1.0]]);
}

#[test]
fn test_action_value_matches_predict() {
    let network = small_network(2);
    let state = array![0.3, -0.7];
    let (best, values) = network.action_value(state.view()).unwrap();
    let batch = network.predict(state.view().insert_axis(ndarray::Axis(0))).unwrap();
    assert_eq!(values, batch.row(0));
    assert_eq!(best, argmax(values.view()).unwrap());
}

#[test]
fn test_training_reduces_loss() {
    let mut network = small_network(3);
    let states = array![[0.0, 1.0], [1.0, 0.0], [1.0, 1.0], [0.5, -0.5]];
    let targets = array![[1.0, -1.0], [0.0, 2.0], [1.0, 1.0], [0.5, 0.0]];

    let initial = network.train_on_batch(states.view(), targets.view()).unwrap();
    let mut last = initial;
    for _ in 0..500 {
        last = network.train_on_batch(states.view(), targets.view()).unwrap();
    }
    assert!(last < initial * 0.5, "loss went from {} to {}", initial, last);
}

#[test]
fn test_train_rejects_bad_targets() {
    let mut network = small_network(4);
    let states = array![[0.0, 1.0]];

    let err = network.train_on_batch(states.view(), array![[1.0, 2.0, 3.0]].view()).unwrap_err();
    assert!(matches!(err, DdqnError::DimensionMismatch { .. }));

    let err = network.train_on_batch(states.view(), array![[f32::NAN, 0.0]].view()).unwrap_err();
    assert!(matches!(err, DdqnError::Numerical(_)));
}

#[test]
fn test_set_weights_is_a_full_copy() {
    let source = small_network(5);
    let mut copy = small_network(6);
    let probe = array![[0.2, 0.9], [-1.0, 0.4]];
    assert_ne!(source.predict(probe.view()).unwrap(), copy.predict(probe.view()).unwrap());

    copy.set_weights(source.get_weights()).unwrap();
    assert_eq!(source.predict(probe.view()).unwrap(), copy.predict(probe.view()).unwrap());
    assert_eq!(copy.get_weights(), source.get_weights());
}

#[test]
fn test_set_weights_rejects_other_architecture() {
    let mut rng = StdRng::seed_from_u64(7);
    let other = NeuralNetwork::q_network(2, 2, 0.01, &mut rng).unwrap();
    let mut network = small_network(8);
    let before = network.get_weights();

    assert!(network.set_weights(other.get_weights()).is_err());
    assert_eq!(network.get_weights(), before);
}

#[test]
fn test_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("network.bin");
    let network = small_network(9);
    network.save(&path).unwrap();

    let loaded = NeuralNetwork::load(&path).unwrap();
    let probe = array![[0.1, 0.2]];
    assert_eq!(network.predict(probe.view()).unwrap(), loaded.predict(probe.view()).unwrap());
    assert_eq!(loaded.learning_rate, network.learning_rate);
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let err = NeuralNetwork::load(dir.path().join("absent.bin")).unwrap_err();
    assert!(matches!(err, DdqnError::Io(_)));
}
