//! Network driver
//!
//! Owns a set of neurons and the synapses coupling them and advances the
//! whole system one tick at a time. Every tick runs two phases:
//!
//! 1. every synapse reads its endpoints and injects coupling currents;
//! 2. every neuron integrates once, consuming its accumulated input.
//!
//! Running them in the other order loses one tick of coupling, since a
//! neuron clears its input when it steps.
//!
//! Each phase computes into scratch state first and only commits once every
//! element has succeeded, so a failed tick leaves the network as it was.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{check_dt, check_dt_at, NeunError, Result};
use crate::integrator::{IntegratorKind, RungeKutta4, RungeKutta6};
use crate::model::{ParameterId, VariableId};
use crate::neuron::AnyNeuron;
use crate::scalar::Precision;
use crate::synapse::{AnySynapse, DiffusionSynapse, ElectricalSynapse};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle to a neuron owned by a [`Network`]
///
/// Handles carry a generation, so a handle to a removed neuron never
/// resolves to a neuron added later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NeuronId {
    index: u32,
    generation: u32,
}

impl NeuronId {
    /// Slot index
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Slot generation
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "neuron#{}.{}", self.index, self.generation)
    }
}

/// Handle to a synapse owned by a [`Network`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SynapseId(u64);

impl SynapseId {
    /// Raw identifier
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SynapseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "synapse#{}", self.0)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    neuron: Option<AnyNeuron>,
}

/// A synapse bound to two neurons of the network
#[derive(Debug)]
pub struct SynapseLink {
    /// Source endpoint
    pub a: NeuronId,
    /// Target endpoint
    pub b: NeuronId,
    /// Coupling unit
    pub synapse: AnySynapse,
}

/// Coupled neurons advanced in lockstep
#[derive(Debug, Default)]
pub struct Network {
    slots: Vec<Slot>,
    free: Vec<u32>,
    synapses: BTreeMap<SynapseId, SynapseLink>,
    next_synapse: u64,
    time: f64,
}

fn pair_mut(slots: &mut [Slot], i: usize, j: usize) -> (&mut Slot, &mut Slot) {
    debug_assert_ne!(i, j);
    if i < j {
        let (lo, hi) = slots.split_at_mut(j);
        (&mut lo[i], &mut hi[0])
    } else {
        let (lo, hi) = slots.split_at_mut(i);
        (&mut hi[0], &mut lo[j])
    }
}

impl Network {
    /// Create an empty network
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a neuron
    pub fn add_neuron(&mut self, neuron: AnyNeuron) -> NeuronId {
        log::debug!("adding {} neuron", neuron.type_name());
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.neuron = Some(neuron);
            NeuronId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                neuron: Some(neuron),
            });
            NeuronId { index, generation: 0 }
        }
    }

    /// Remove a neuron and hand it back
    ///
    /// Synapses attached to it are left in place and make the next
    /// [`Network::step_synapses`] fail until [`Network::prune_dangling`]
    /// or [`Network::remove_synapse`] drops them.
    pub fn remove_neuron(&mut self, id: NeuronId) -> Result<AnyNeuron> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .ok_or_else(|| NeunError::dangling(id))?;
        let neuron = slot.neuron.take().ok_or_else(|| NeunError::dangling(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        log::debug!("removed {} ({})", id, neuron.type_name());
        Ok(neuron)
    }

    /// Whether the handle refers to a live neuron
    pub fn contains(&self, id: NeuronId) -> bool {
        self.neuron(id).is_ok()
    }

    /// Borrow a neuron
    pub fn neuron(&self, id: NeuronId) -> Result<&AnyNeuron> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.neuron.as_ref())
            .ok_or_else(|| NeunError::dangling(id))
    }

    /// Mutably borrow a neuron
    pub fn neuron_mut(&mut self, id: NeuronId) -> Result<&mut AnyNeuron> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.neuron.as_mut())
            .ok_or_else(|| NeunError::dangling(id))
    }

    /// Handles of all live neurons in slot order
    pub fn neuron_ids(&self) -> Vec<NeuronId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.neuron.is_some())
            .map(|(i, s)| NeuronId {
                index: i as u32,
                generation: s.generation,
            })
            .collect()
    }

    /// Number of live neurons
    pub fn neuron_count(&self) -> usize {
        self.slots.iter().filter(|s| s.neuron.is_some()).count()
    }

    /// Number of synapses, dangling ones included
    pub fn synapse_count(&self) -> usize {
        self.synapses.len()
    }

    /// Handles of all synapses in insertion order
    pub fn synapse_ids(&self) -> Vec<SynapseId> {
        self.synapses.keys().copied().collect()
    }

    /// Borrow a synapse with its endpoints
    pub fn synapse(&self, id: SynapseId) -> Result<&SynapseLink> {
        self.synapses.get(&id).ok_or_else(|| NeunError::SynapseNotFound {
            synapse: id.to_string(),
        })
    }

    /// Mutably borrow a synapse
    pub fn synapse_mut(&mut self, id: SynapseId) -> Result<&mut AnySynapse> {
        self.synapses
            .get_mut(&id)
            .map(|link| &mut link.synapse)
            .ok_or_else(|| NeunError::SynapseNotFound {
                synapse: id.to_string(),
            })
    }

    /// Time advanced by `step_neurons` since construction
    pub fn time(&self) -> f64 {
        self.time
    }

    fn endpoints(&self, a: NeuronId, b: NeuronId) -> Result<(&AnyNeuron, &AnyNeuron)> {
        if a == b {
            return Err(NeunError::invalid_config(format!(
                "{} cannot be coupled to itself",
                a
            )));
        }
        let na = self.neuron(a)?;
        let nb = self.neuron(b)?;
        if na.precision() != nb.precision() {
            return Err(NeunError::MismatchedPrecision {
                a: na.precision(),
                b: nb.precision(),
            });
        }
        Ok((na, nb))
    }

    fn insert_synapse(&mut self, a: NeuronId, b: NeuronId, synapse: AnySynapse) -> SynapseId {
        let id = SynapseId(self.next_synapse);
        self.next_synapse += 1;
        log::debug!("{}: {} {} -> {}", id, synapse.kind(), a, b);
        self.synapses.insert(id, SynapseLink { a, b, synapse });
        id
    }

    /// Couple two neurons with an [`ElectricalSynapse`]
    ///
    /// Both neurons must exist, be distinct and share a precision, and both
    /// variables must be valid for their models.
    pub fn add_electrical_synapse(
        &mut self,
        a: NeuronId,
        var_a: VariableId,
        b: NeuronId,
        var_b: VariableId,
        g_ab: f64,
        g_ba: f64,
    ) -> Result<SynapseId> {
        let synapse = match self.endpoints(a, b)? {
            (AnyNeuron::Single(x), AnyNeuron::Single(y)) => AnySynapse::Single(Box::new(
                ElectricalSynapse::<f32>::new(x, var_a, y, var_b, g_ab as f32, g_ba as f32)?,
            )),
            (AnyNeuron::Double(x), AnyNeuron::Double(y)) => AnySynapse::Double(Box::new(
                ElectricalSynapse::<f64>::new(x, var_a, y, var_b, g_ab, g_ba)?,
            )),
            (x, y) => {
                return Err(NeunError::MismatchedPrecision {
                    a: x.precision(),
                    b: y.precision(),
                })
            }
        };
        Ok(self.insert_synapse(a, b, synapse))
    }

    /// Couple two neurons with a [`DiffusionSynapse`]
    #[allow(clippy::too_many_arguments)]
    pub fn add_diffusion_synapse(
        &mut self,
        a: NeuronId,
        var_a: VariableId,
        b: NeuronId,
        var_b: VariableId,
        g_ab: f64,
        g_ba: f64,
        tau: f64,
        integrator: IntegratorKind,
    ) -> Result<SynapseId> {
        let synapse = match (self.endpoints(a, b)?, integrator) {
            ((AnyNeuron::Single(x), AnyNeuron::Single(y)), IntegratorKind::Rk4) => {
                AnySynapse::Single(Box::new(DiffusionSynapse::<f32, RungeKutta4>::new(
                    x, var_a, y, var_b, g_ab as f32, g_ba as f32, tau as f32,
                )?))
            }
            ((AnyNeuron::Single(x), AnyNeuron::Single(y)), IntegratorKind::Rk6) => {
                AnySynapse::Single(Box::new(DiffusionSynapse::<f32, RungeKutta6>::new(
                    x, var_a, y, var_b, g_ab as f32, g_ba as f32, tau as f32,
                )?))
            }
            ((AnyNeuron::Double(x), AnyNeuron::Double(y)), IntegratorKind::Rk4) => {
                AnySynapse::Double(Box::new(DiffusionSynapse::<f64, RungeKutta4>::new(
                    x, var_a, y, var_b, g_ab, g_ba, tau,
                )?))
            }
            ((AnyNeuron::Double(x), AnyNeuron::Double(y)), IntegratorKind::Rk6) => {
                AnySynapse::Double(Box::new(DiffusionSynapse::<f64, RungeKutta6>::new(
                    x, var_a, y, var_b, g_ab, g_ba, tau,
                )?))
            }
            ((x, y), _) => {
                return Err(NeunError::MismatchedPrecision {
                    a: x.precision(),
                    b: y.precision(),
                })
            }
        };
        Ok(self.insert_synapse(a, b, synapse))
    }

    /// Remove a synapse
    pub fn remove_synapse(&mut self, id: SynapseId) -> Result<SynapseLink> {
        let link = self.synapses.remove(&id).ok_or_else(|| NeunError::SynapseNotFound {
            synapse: id.to_string(),
        })?;
        log::debug!("removed {}", id);
        Ok(link)
    }

    /// Drop every synapse with a removed endpoint, returning how many
    pub fn prune_dangling(&mut self) -> usize {
        let before = self.synapses.len();
        let slots = &self.slots;
        let alive = |id: NeuronId| {
            slots
                .get(id.index as usize)
                .map_or(false, |s| s.generation == id.generation && s.neuron.is_some())
        };
        self.synapses.retain(|_, link| alive(link.a) && alive(link.b));
        let pruned = before - self.synapses.len();
        if pruned > 0 {
            log::warn!("pruned {} dangling synapse(s)", pruned);
        }
        pruned
    }

    /// Add external current to a neuron for the next step
    pub fn apply_input(&mut self, id: NeuronId, current: f64) -> Result<()> {
        self.neuron_mut(id)?.add_input(current);
        Ok(())
    }

    /// Read a neuron variable
    pub fn get(&self, id: NeuronId, var: VariableId) -> Result<f64> {
        self.neuron(id)?.get(var)
    }

    /// Overwrite a neuron variable
    pub fn set(&mut self, id: NeuronId, var: VariableId, value: f64) -> Result<()> {
        self.neuron_mut(id)?.set(var, value)
    }

    /// Read a neuron parameter
    pub fn get_param(&self, id: NeuronId, param: ParameterId) -> Result<f64> {
        self.neuron(id)?.get_param(param)
    }

    /// Overwrite a neuron parameter
    pub fn set_param(&mut self, id: NeuronId, param: ParameterId, value: f64) -> Result<()> {
        self.neuron_mut(id)?.set_param(param, value)
    }

    /// Most recent current a synapse injected into its b endpoint
    pub fn synaptic_current(&self, id: SynapseId) -> Result<f64> {
        Ok(self.synapse(id)?.synapse.synaptic_current())
    }

    /// Most recent current a synapse injected into its a endpoint
    pub fn current_b_to_a(&self, id: SynapseId) -> Result<f64> {
        Ok(self.synapse(id)?.synapse.current_b_to_a())
    }

    /// Synapse phase: every synapse injects its coupling currents
    ///
    /// All synapses are computed before any current is injected, so on error
    /// (`InvalidStep`, `DanglingEndpoint`, ...) nothing has changed.
    pub fn step_synapses(&mut self, dt: f64) -> Result<()> {
        self.validate_dt(dt)?;
        self.check_links()?;
        self.stage_synapses(dt)?;
        self.inject_synapse_currents();
        self.commit_synapses();
        Ok(())
    }

    /// Neuron phase: every neuron integrates once and clears its input
    ///
    /// Every neuron is integrated before any is committed; if one fails, no
    /// neuron changes.
    pub fn step_neurons(&mut self, dt: f64) -> Result<()> {
        self.validate_dt(dt)?;
        self.stage_neurons(dt)?;
        self.commit_neurons(dt);
        Ok(())
    }

    /// One tick: synapse phase, then neuron phase
    ///
    /// A failure in either phase leaves every neuron and synapse as it was
    /// before the call.
    pub fn tick(&mut self, dt: f64) -> Result<()> {
        log::trace!("tick t={} dt={}", self.time, dt);
        self.validate_dt(dt)?;
        self.check_links()?;
        self.stage_synapses(dt)?;

        let saved: Vec<Option<f64>> = self
            .slots
            .iter()
            .map(|s| s.neuron.as_ref().map(AnyNeuron::pending_input))
            .collect();
        self.inject_synapse_currents();

        if let Err(err) = self.stage_neurons(dt) {
            for (slot, input) in self.slots.iter_mut().zip(saved) {
                if let (Some(neuron), Some(input)) = (slot.neuron.as_mut(), input) {
                    neuron.set_pending_input(input);
                }
            }
            return Err(err);
        }

        self.commit_synapses();
        self.commit_neurons(dt);
        Ok(())
    }

    /// Reject `dt` unless it is usable at every precision present
    fn validate_dt(&self, dt: f64) -> Result<()> {
        check_dt(dt)?;
        let single = self
            .slots
            .iter()
            .filter_map(|s| s.neuron.as_ref())
            .any(|n| n.precision() == Precision::Single)
            || self
                .synapses
                .values()
                .any(|link| link.synapse.precision() == Precision::Single);
        if single {
            check_dt_at(dt, Precision::Single)?;
        }
        Ok(())
    }

    fn check_links(&self) -> Result<()> {
        for link in self.synapses.values() {
            self.neuron(link.a)?;
            self.neuron(link.b)?;
        }
        Ok(())
    }

    fn stage_synapses(&mut self, dt: f64) -> Result<()> {
        let slots = &self.slots;
        let endpoint = |id: NeuronId| {
            slots
                .get(id.index as usize)
                .and_then(|s| s.neuron.as_ref())
                .ok_or_else(|| NeunError::dangling(id))
        };
        for link in self.synapses.values_mut() {
            match (endpoint(link.a)?, endpoint(link.b)?, &mut link.synapse) {
                (AnyNeuron::Single(x), AnyNeuron::Single(y), AnySynapse::Single(s)) => {
                    s.stage(x, y, dt as f32)?
                }
                (AnyNeuron::Double(x), AnyNeuron::Double(y), AnySynapse::Double(s)) => {
                    s.stage(x, y, dt)?
                }
                (x, y, _) => {
                    return Err(NeunError::MismatchedPrecision {
                        a: x.precision(),
                        b: y.precision(),
                    })
                }
            }
        }
        Ok(())
    }

    // Only called after a successful `stage_synapses`.
    fn inject_synapse_currents(&mut self) {
        let slots = &mut self.slots;
        for link in self.synapses.values() {
            let (sa, sb) = pair_mut(slots, link.a.index as usize, link.b.index as usize);
            match (sa.neuron.as_mut(), sb.neuron.as_mut(), &link.synapse) {
                (
                    Some(AnyNeuron::Single(x)),
                    Some(AnyNeuron::Single(y)),
                    AnySynapse::Single(s),
                ) => s.inject_staged(x, y),
                (
                    Some(AnyNeuron::Double(x)),
                    Some(AnyNeuron::Double(y)),
                    AnySynapse::Double(s),
                ) => s.inject_staged(x, y),
                _ => {}
            }
        }
    }

    fn commit_synapses(&mut self) {
        for link in self.synapses.values_mut() {
            link.synapse.commit();
        }
    }

    fn stage_neurons(&mut self, dt: f64) -> Result<()> {
        #[cfg(feature = "parallel")]
        let result = self
            .slots
            .par_iter_mut()
            .filter_map(|s| s.neuron.as_mut())
            .try_for_each(|n| n.stage_step(dt));

        #[cfg(not(feature = "parallel"))]
        let result = self
            .slots
            .iter_mut()
            .filter_map(|s| s.neuron.as_mut())
            .try_for_each(|n| n.stage_step(dt));

        result
    }

    fn commit_neurons(&mut self, dt: f64) {
        for neuron in self.slots.iter_mut().filter_map(|s| s.neuron.as_mut()) {
            neuron.commit_step();
        }
        self.time += dt;
    }

    /// Precision shared by all neurons, if any
    pub fn precision(&self) -> Option<Precision> {
        self.slots
            .iter()
            .filter_map(|s| s.neuron.as_ref())
            .map(AnyNeuron::precision)
            .next()
    }

    /// Partition live neurons into groups connected by live synapses
    ///
    /// Groups are ordered by their lowest slot and sorted internally.
    /// Distinct groups share no state and may be stepped independently.
    pub fn connected_components(&self) -> Vec<Vec<NeuronId>> {
        let mut parent: Vec<usize> = (0..self.slots.len()).collect();

        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for link in self.synapses.values() {
            if !(self.contains(link.a) && self.contains(link.b)) {
                continue;
            }
            let ra = find(&mut parent, link.a.index as usize);
            let rb = find(&mut parent, link.b.index as usize);
            if ra != rb {
                parent[ra.max(rb)] = ra.min(rb);
            }
        }

        let mut groups: BTreeMap<usize, Vec<NeuronId>> = BTreeMap::new();
        for id in self.neuron_ids() {
            let root = find(&mut parent, id.index as usize);
            groups.entry(root).or_default().push(id);
        }
        groups.into_values().collect()
    }
}
