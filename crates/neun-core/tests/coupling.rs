use neun_core::models::{hodgkin_huxley as hh, HodgkinHuxleyModel};
use neun_core::{
    ElectricalSynapse, Field, IntegratorKind, Model, ModelInfo, ModelRegistry, Network, Neuron,
    NeunError, Precision, Scalar, Synapse, VariableId,
};

const DT: f64 = 0.001;
const V: VariableId = VariableId(0);

static INTEGRATE_INFO: ModelInfo = ModelInfo {
    class_name: "IntegrateModel",
    short_name: "Int",
    description: "Potential integrates its input current",
    variables: &[Field::new("v", "Potential")],
    parameters: &[],
};

/// dv/dt = input
#[derive(Debug, Clone)]
struct Integrate;

impl<S: Scalar> Model<S> for Integrate {
    fn info(&self) -> &'static ModelInfo {
        &INTEGRATE_INFO
    }
    fn default_variables(&self) -> Vec<S> {
        vec![S::ZERO]
    }
    fn default_parameters(&self) -> Vec<S> {
        Vec::new()
    }
    fn derivative(&self, _vars: &[S], _params: &[S], input: S, _t: S, out: &mut [S]) {
        out[0] = input;
    }
}

static CLAMP_INFO: ModelInfo = ModelInfo {
    class_name: "ClampModel",
    short_name: "Clamp",
    description: "Potential held at its initial value",
    variables: &[Field::new("v", "Potential")],
    parameters: &[],
};

/// dv/dt = 0
#[derive(Debug, Clone)]
struct Clamp;

impl<S: Scalar> Model<S> for Clamp {
    fn info(&self) -> &'static ModelInfo {
        &CLAMP_INFO
    }
    fn default_variables(&self) -> Vec<S> {
        vec![S::ZERO]
    }
    fn default_parameters(&self) -> Vec<S> {
        Vec::new()
    }
    fn derivative(&self, _vars: &[S], _params: &[S], _input: S, _t: S, out: &mut [S]) {
        out[0] = S::ZERO;
    }
}

fn hh_pair() -> (Neuron<f64>, Neuron<f64>) {
    let mut a: Neuron<f64> = Neuron::new(HodgkinHuxleyModel);
    let mut b: Neuron<f64> = Neuron::new(HodgkinHuxleyModel);
    a.set(hh::V, -75.0).unwrap();
    b.set(hh::V, -65.0).unwrap();
    (a, b)
}

#[test]
fn gap_junction_scenario() {
    let (mut a, mut b) = hh_pair();
    let mut syn = ElectricalSynapse::new(&a, hh::V, &b, hh::V, -0.002, -0.002).unwrap();

    syn.step(&mut a, &mut b, DT).unwrap();

    assert!((b.pending_input() - 0.02).abs() < 1e-12);
    assert!((a.pending_input() + 0.02).abs() < 1e-12);
    assert!((syn.synaptic_current() - 0.02).abs() < 1e-12);
}

#[test]
fn gap_junction_current_moves_integrating_neurons() {
    let mut a: Neuron<f64> = Neuron::new(Integrate);
    let mut b: Neuron<f64> = Neuron::new(Integrate);
    a.set(V, -75.0).unwrap();
    b.set(V, -65.0).unwrap();
    let mut syn = ElectricalSynapse::new(&a, V, &b, V, -0.002, -0.002).unwrap();

    syn.step(&mut a, &mut b, DT).unwrap();
    a.step(DT).unwrap();
    b.step(DT).unwrap();

    // v moves by exactly pending_input * dt
    assert!((a.get(V).unwrap() - -75.00002).abs() < 1e-12);
    assert!((b.get(V).unwrap() - -64.99998).abs() < 1e-12);
    assert_eq!(a.pending_input(), 0.0);
    assert_eq!(b.pending_input(), 0.0);
}

#[test]
fn synapse_before_neurons_couples_in_the_same_tick() {
    let (mut a, mut b) = hh_pair();
    let (mut a_late, mut b_late) = hh_pair();
    let (_, mut b_alone) = hh_pair();

    let mut syn = ElectricalSynapse::new(&a, hh::V, &b, hh::V, -0.002, -0.002).unwrap();
    let mut syn_late =
        ElectricalSynapse::new(&a_late, hh::V, &b_late, hh::V, -0.002, -0.002).unwrap();

    // Required order
    syn.step(&mut a, &mut b, DT).unwrap();
    a.step(DT).unwrap();
    b.step(DT).unwrap();

    // Reversed order: the coupling current only lands in the next tick
    a_late.step(DT).unwrap();
    b_late.step(DT).unwrap();
    syn_late.step(&mut a_late, &mut b_late, DT).unwrap();

    b_alone.step(DT).unwrap();

    assert_ne!(b.get(hh::V).unwrap(), b_alone.get(hh::V).unwrap());
    assert_eq!(b_late.get(hh::V).unwrap(), b_alone.get(hh::V).unwrap());
    assert!(b_late.pending_input() != 0.0);
}

#[test]
fn one_way_coupling_leaves_source_untouched() {
    let (mut a, mut b) = hh_pair();
    let (mut a_alone, mut b_alone) = hh_pair();
    let mut syn = ElectricalSynapse::new(&a, hh::V, &b, hh::V, 0.05, 0.0).unwrap();

    for _ in 0..2000 {
        syn.step(&mut a, &mut b, DT).unwrap();
        a.add_input(0.1);
        a.step(DT).unwrap();
        b.step(DT).unwrap();

        a_alone.add_input(0.1);
        a_alone.step(DT).unwrap();
        b_alone.step(DT).unwrap();
    }

    assert_eq!(a.variables(), a_alone.variables());
    assert_ne!(b.variables(), b_alone.variables());
}

fn synapsis_network(precision: Precision) -> (Network, Vec<f64>) {
    let registry = ModelRegistry::builtin();
    let mut network = Network::new();
    let a = network.add_neuron(
        registry
            .create_neuron("HH", precision, IntegratorKind::Rk4)
            .unwrap(),
    );
    let b = network.add_neuron(
        registry
            .create_neuron("HH", precision, IntegratorKind::Rk4)
            .unwrap(),
    );
    network.set(a, hh::V, -75.0).unwrap();
    let s = network
        .add_electrical_synapse(a, hh::V, b, hh::V, -0.002, -0.002)
        .unwrap();

    let mut trace = Vec::new();
    for _ in 0..5000 {
        network.apply_input(a, 0.1).unwrap();
        network.tick(DT).unwrap();
        trace.push(network.get(a, hh::V).unwrap());
        trace.push(network.get(b, hh::V).unwrap());
        trace.push(network.synaptic_current(s).unwrap());
    }
    (network, trace)
}

#[test]
fn identical_runs_are_bitwise_identical() {
    let (_, first) = synapsis_network(Precision::Double);
    let (_, second) = synapsis_network(Precision::Double);
    assert_eq!(first, second);

    let (_, single_a) = synapsis_network(Precision::Single);
    let (_, single_b) = synapsis_network(Precision::Single);
    assert_eq!(single_a, single_b);
}

#[test]
fn network_matches_manual_driving() {
    let (network, trace) = synapsis_network(Precision::Double);

    let (mut a, mut b) = hh_pair();
    b.set(hh::V, -65.0).unwrap();
    let mut syn = ElectricalSynapse::new(&a, hh::V, &b, hh::V, -0.002, -0.002).unwrap();
    let mut manual = Vec::new();
    for _ in 0..5000 {
        syn.step(&mut a, &mut b, DT).unwrap();
        a.add_input(0.1);
        a.step(DT).unwrap();
        b.step(DT).unwrap();
        manual.push(a.get(hh::V).unwrap());
        manual.push(b.get(hh::V).unwrap());
        manual.push(syn.synaptic_current());
    }

    assert_eq!(trace, manual);
    assert!((network.time() - 5.0).abs() < 1e-9);
}

#[test]
fn mixed_precision_is_rejected() {
    let registry = ModelRegistry::builtin();
    let mut network = Network::new();
    let a = network.add_neuron(
        registry
            .create_neuron("Iz", Precision::Double, IntegratorKind::Rk4)
            .unwrap(),
    );
    let b = network.add_neuron(
        registry
            .create_neuron("HR", Precision::Single, IntegratorKind::Rk6)
            .unwrap(),
    );
    let x = network.neuron(b).unwrap().variable_id("x").unwrap();
    let v = network.neuron(a).unwrap().variable_id("v").unwrap();

    assert!(matches!(
        network.add_electrical_synapse(a, v, b, x, 1.0, 1.0),
        Err(NeunError::MismatchedPrecision { .. })
    ));
}

#[test]
fn unknown_variable_name() {
    let registry = ModelRegistry::builtin();
    let neuron = registry
        .create_neuron("HH", Precision::Double, IntegratorKind::Rk4)
        .unwrap();
    assert!(matches!(
        neuron.variable_id("w"),
        Err(NeunError::InvalidVariable { .. })
    ));
}

fn clamped_diffusion_trace(precision: Precision, integrator: IntegratorKind) -> Vec<(f64, f64)> {
    let mut registry = ModelRegistry::builtin();
    registry.register(Clamp).unwrap();
    let mut network = Network::new();
    let a = network.add_neuron(registry.create_neuron("Clamp", precision, integrator).unwrap());
    let b = network.add_neuron(registry.create_neuron("Clamp", precision, integrator).unwrap());
    network.set(a, V, -75.0).unwrap();
    network.set(b, V, -65.0).unwrap();
    let s = network
        .add_diffusion_synapse(a, V, b, V, 0.5, 0.25, 2.0, integrator)
        .unwrap();

    let mut trace = Vec::new();
    for _ in 0..500 {
        network.tick(0.01).unwrap();
        trace.push((
            network.synaptic_current(s).unwrap(),
            network.current_b_to_a(s).unwrap(),
        ));
    }
    assert_eq!(network.get(a, V).unwrap(), -75.0);
    assert_eq!(network.get(b, V).unwrap(), -65.0);
    trace
}

fn assert_relaxes_to_closed_form(trace: &[(f64, f64)], tolerance: f64) {
    for (k, (ab, ba)) in trace.iter().enumerate() {
        let t = (k + 1) as f64 * 0.01;
        let s = -10.0 * (1.0 - (-t / 2.0).exp());
        assert!((ab - 0.5 * s).abs() < tolerance, "t={} i1={} expected {}", t, ab, 0.5 * s);
        assert!((ba + 0.25 * s).abs() < tolerance, "t={} i2={} expected {}", t, ba, -0.25 * s);
    }
}

#[test]
fn diffusion_link_relaxes_through_the_driver() {
    let double = clamped_diffusion_trace(Precision::Double, IntegratorKind::Rk6);
    assert_relaxes_to_closed_form(&double, 1e-9);

    let single = clamped_diffusion_trace(Precision::Single, IntegratorKind::Rk4);
    assert_relaxes_to_closed_form(&single, 1e-3);

    // After 5 time units the filter is most of the way to the -10 drive
    let (ab, ba) = double[499];
    assert!(ab < -0.5 * 10.0 * 0.9 && ab > -5.0);
    assert!(ba > 0.25 * 10.0 * 0.9 && ba < 2.5);
}
