//! Voltage-, ligand- and calcium-gated ion channels.
//!
//! Kinetics follow steady-state/time-constant (`x_inf`, `tau_x`) formulations
//! rather than raw alpha/beta rate equations: every steady state is a bounded
//! logistic and every time constant is bounded away from zero, so no input
//! (including `dt == 0` or voltages at the clamp rails) can produce a NaN or
//! an infinite gating variable. Gating relaxes towards `x_inf` by the
//! closed-form exponential update `x + (x_inf - x) * (1 - exp(-dt / tau))`,
//! which is unconditionally stable for any `dt >= 0`.

use nc_types::NeuralSignal;

/// Physiological temperature used for Q10 correction of time constants.
const PHYSIOLOGICAL_TEMP_C: f64 = 37.0;
/// Reference temperature the bare kinetic formulas below were fit at.
const REFERENCE_TEMP_C: f64 = 22.0;

/// Speed up a time constant fit at `REFERENCE_TEMP_C` for `PHYSIOLOGICAL_TEMP_C`.
fn q10_tau(tau: f64, q10: f64) -> f64 {
    tau / q10.powf((PHYSIOLOGICAL_TEMP_C - REFERENCE_TEMP_C) / 10.0)
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Exponential relaxation of a gating variable towards `x_inf`, stable for any `dt >= 0`.
fn relax(x: f64, x_inf: f64, tau: f64, dt: f64) -> f64 {
    let tau = tau.max(1e-6);
    let dt = dt.max(0.0);
    x_inf + (x - x_inf) * (-dt / tau).exp()
}

/// The ion a channel is selective for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IonSelectivity {
    /// Na+.
    Sodium,
    /// K+.
    Potassium,
    /// Ca2+.
    Calcium,
    /// Cl-.
    Chloride,
}

/// Functional family of a channel, independent of the ion it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    /// Fast, transient, voltage-gated (e.g. axonal Nav).
    VoltageGatedTransient,
    /// Slower, sustained voltage-gated (e.g. delayed rectifier Kv).
    VoltageGatedSustained,
    /// Voltage- and calcium-gated with calcium-dependent inactivation.
    VoltageCalciumGated,
    /// Ligand-gated with desensitization under sustained agonist.
    LigandGated,
}

/// Activation/deactivation time constants and the open/closed threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelTrigger {
    /// Time constant of the activation gate, milliseconds.
    pub activation_tau_ms: f64,
    /// Time constant of the deactivation/inactivation gate, milliseconds.
    pub deactivation_tau_ms: f64,
    /// Open-probability threshold above which `should_open` reports open.
    pub open_threshold: f64,
}

/// Instantaneous, queryable channel state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelState {
    /// Whether the channel is currently considered open.
    pub is_open: bool,
    /// Instantaneous conductance, `g_max * gating factor`.
    pub conductance: f64,
    /// Membrane voltage the state was computed at.
    pub membrane_voltage: f64,
    /// Calcium concentration the state was computed at.
    pub calcium_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Gating {
    /// Primary activation gate.
    m: f64,
    /// Fast inactivation / ligand-dependent desensitization.
    h: f64,
}

impl Default for Gating {
    fn default() -> Self {
        Self { m: 0.0, h: 1.0 }
    }
}

/// Fast sodium channel (Nav-like): activates and inactivates with voltage.
#[derive(Debug, Clone, PartialEq)]
pub struct FastSodiumChannel {
    g_max: f64,
    gating: Gating,
    is_open: bool,
    last_voltage: f64,
    last_calcium: f64,
}

impl FastSodiumChannel {
    /// `g_max` in picosiemens; contract range is 10-30 pS.
    pub fn new(g_max: f64) -> Self {
        Self {
            g_max,
            gating: Gating::default(),
            is_open: false,
            last_voltage: 0.0,
            last_calcium: 0.0,
        }
    }

    fn m_inf(v: f64) -> f64 {
        logistic((v + 35.0) / 9.0)
    }

    fn h_inf(v: f64) -> f64 {
        logistic(-(v + 62.0) / 7.0)
    }

    fn tau_m(v: f64) -> f64 {
        q10_tau(0.05 + 0.3 / (1.0 + ((v + 35.0) / 20.0).abs()), 2.3).clamp(0.02, 1.0)
    }

    fn tau_h(v: f64) -> f64 {
        q10_tau(0.5 + 4.0 / (1.0 + ((v + 60.0) / 20.0).abs()), 2.3).clamp(0.3, 8.0)
    }
}

/// Delayed-rectifier potassium channel (Kv-like): slow activation, no inactivation.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayedRectifierPotassiumChannel {
    g_max: f64,
    gating: Gating,
    is_open: bool,
    last_voltage: f64,
    last_calcium: f64,
}

impl DelayedRectifierPotassiumChannel {
    /// `g_max` in picosiemens; contract range is 5-20 pS.
    pub fn new(g_max: f64) -> Self {
        Self {
            g_max,
            gating: Gating { m: 0.0, h: 1.0 },
            is_open: false,
            last_voltage: 0.0,
            last_calcium: 0.0,
        }
    }

    fn n_inf(v: f64) -> f64 {
        logistic((v + 30.0) / 10.0)
    }

    fn tau_n(v: f64) -> f64 {
        q10_tau(1.0 + 6.0 / (1.0 + ((v + 30.0) / 20.0).abs()), 3.0).clamp(1.0, 10.0)
    }
}

/// L-type calcium channel (Cav-like): voltage-activated, calcium-dependent inactivation.
#[derive(Debug, Clone, PartialEq)]
pub struct LTypeCalciumChannel {
    g_max: f64,
    /// Half-inactivation calcium concentration, arbitrary concentration units.
    ca_inactivation_k: f64,
    gating: Gating,
    is_open: bool,
    last_voltage: f64,
    last_calcium: f64,
}

impl LTypeCalciumChannel {
    /// `g_max` in picosiemens; contract range is 1-10 pS.
    pub fn new(g_max: f64) -> Self {
        Self {
            g_max,
            ca_inactivation_k: 0.5,
            gating: Gating::default(),
            is_open: false,
            last_voltage: 0.0,
            last_calcium: 0.0,
        }
    }

    fn m_inf(v: f64) -> f64 {
        logistic((v + 10.0) / 6.24)
    }

    fn tau_m(v: f64) -> f64 {
        q10_tau(0.5 + 3.0 / (1.0 + ((v + 10.0) / 15.0).abs()), 2.0).clamp(0.3, 5.0)
    }

    fn h_inf(&self, calcium: f64) -> f64 {
        let calcium = calcium.max(0.0);
        self.ca_inactivation_k / (self.ca_inactivation_k + calcium)
    }
}

/// GABA-A chloride channel: ligand-gated, desensitizes under sustained agonist.
#[derive(Debug, Clone, PartialEq)]
pub struct GabaAChannel {
    g_max: f64,
    /// Ligand concentration producing half-maximal activation.
    activation_kd: f64,
    /// Ligand concentration producing half-maximal desensitization.
    desensitization_kd: f64,
    gating: Gating,
    is_open: bool,
    last_voltage: f64,
    last_calcium: f64,
}

impl GabaAChannel {
    /// `g_max` in picosiemens; contract range is 10-25 pS.
    pub fn new(g_max: f64) -> Self {
        Self {
            g_max,
            activation_kd: 1.0,
            desensitization_kd: 2.0,
            gating: Gating::default(),
            is_open: false,
            last_voltage: 0.0,
            last_calcium: 0.0,
        }
    }

    fn m_inf(&self, ligand: f64) -> f64 {
        let ligand = ligand.max(0.0);
        ligand / (ligand + self.activation_kd)
    }

    fn h_inf(&self, ligand: f64) -> f64 {
        let ligand = ligand.max(0.0);
        self.desensitization_kd / (self.desensitization_kd + ligand)
    }

    const TAU_M_MS: f64 = 2.0;
    const TAU_DESENS_MS: f64 = 150.0;
}

/// Closed sum type over the required channel variants.
///
/// New channel kinds are added as enum variants, never via runtime trait-object
/// injection; every match below is exhaustive and the compiler enforces that a
/// new variant is wired into every contract method.
#[derive(Debug, Clone, PartialEq)]
pub enum IonChannel {
    /// Fast sodium (Nav-like).
    FastSodium(FastSodiumChannel),
    /// Delayed-rectifier potassium (Kv-like).
    DelayedRectifierPotassium(DelayedRectifierPotassiumChannel),
    /// L-type calcium (Cav-like).
    LTypeCalcium(LTypeCalciumChannel),
    /// GABA-A chloride.
    GabaA(GabaAChannel),
}

impl IonChannel {
    /// Convenience constructor for the fast sodium variant.
    pub fn fast_sodium(g_max: f64) -> Self {
        Self::FastSodium(FastSodiumChannel::new(g_max))
    }

    /// Convenience constructor for the delayed-rectifier potassium variant.
    pub fn delayed_rectifier_potassium(g_max: f64) -> Self {
        Self::DelayedRectifierPotassium(DelayedRectifierPotassiumChannel::new(g_max))
    }

    /// Convenience constructor for the L-type calcium variant.
    pub fn l_type_calcium(g_max: f64) -> Self {
        Self::LTypeCalcium(LTypeCalciumChannel::new(g_max))
    }

    /// Convenience constructor for the GABA-A variant.
    pub fn gaba_a(g_max: f64) -> Self {
        Self::GabaA(GabaAChannel::new(g_max))
    }

    /// Evolve gating state by `dt` milliseconds and report the open decision.
    ///
    /// `voltage` is in mV, `ligand_conc` in arbitrary concentration units
    /// (only meaningful to ligand-gated channels), `calcium` in arbitrary
    /// concentration units, `dt` in milliseconds. Never returns NaN/Inf.
    pub fn should_open(
        &mut self,
        voltage: f64,
        ligand_conc: f64,
        calcium: f64,
        dt: f64,
    ) -> (bool, f64, f64) {
        let voltage = voltage.clamp(-200.0, 200.0);
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let calcium = if calcium.is_finite() { calcium.max(0.0) } else { 0.0 };
        let ligand_conc = if ligand_conc.is_finite() { ligand_conc.max(0.0) } else { 0.0 };

        let (factor, duration) = match self {
            Self::FastSodium(c) => {
                let tau_m = FastSodiumChannel::tau_m(voltage);
                let tau_h = FastSodiumChannel::tau_h(voltage);
                c.gating.m = relax(c.gating.m, FastSodiumChannel::m_inf(voltage), tau_m, dt);
                c.gating.h = relax(c.gating.h, FastSodiumChannel::h_inf(voltage), tau_h, dt);
                c.last_voltage = voltage;
                c.last_calcium = calcium;
                (c.gating.m.powi(3) * c.gating.h, tau_m)
            }
            Self::DelayedRectifierPotassium(c) => {
                let tau_n = DelayedRectifierPotassiumChannel::tau_n(voltage);
                c.gating.m = relax(
                    c.gating.m,
                    DelayedRectifierPotassiumChannel::n_inf(voltage),
                    tau_n,
                    dt,
                );
                c.last_voltage = voltage;
                c.last_calcium = calcium;
                (c.gating.m.powi(4), tau_n)
            }
            Self::LTypeCalcium(c) => {
                let tau_m = LTypeCalciumChannel::tau_m(voltage);
                c.gating.m = relax(c.gating.m, LTypeCalciumChannel::m_inf(voltage), tau_m, dt);
                // Calcium-dependent inactivation settles much faster than voltage gating.
                c.gating.h = relax(c.gating.h, c.h_inf(calcium), 20.0, dt);
                c.last_voltage = voltage;
                c.last_calcium = calcium;
                (c.gating.m.powi(2) * c.gating.h, tau_m)
            }
            Self::GabaA(c) => {
                c.gating.m = relax(c.gating.m, c.m_inf(ligand_conc), GabaAChannel::TAU_M_MS, dt);
                c.gating.h = relax(
                    c.gating.h,
                    c.h_inf(ligand_conc),
                    GabaAChannel::TAU_DESENS_MS,
                    dt,
                );
                c.last_voltage = voltage;
                c.last_calcium = calcium;
                (c.gating.m * c.gating.h, GabaAChannel::TAU_M_MS)
            }
        };

        let probability = factor.clamp(0.0, 1.0);
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        let opened = probability >= self.trigger().open_threshold;
        self.set_open(opened);
        (opened, duration, probability)
    }

    fn set_open(&mut self, open: bool) {
        match self {
            Self::FastSodium(c) => c.is_open = open,
            Self::DelayedRectifierPotassium(c) => c.is_open = open,
            Self::LTypeCalcium(c) => c.is_open = open,
            Self::GabaA(c) => c.is_open = open,
        }
    }

    /// Contribute this channel's current to a signal passing through it.
    ///
    /// Channels never rewrite the signal's value themselves (that is the
    /// dendritic mode's job); they report the current they would contribute
    /// at the given voltage/calcium so the caller can fold it into the
    /// accumulator. `pass_through` is always true: a closed channel simply
    /// contributes zero current rather than blocking the signal.
    pub fn modulate_current(
        &self,
        _signal: &NeuralSignal,
        voltage: f64,
        _calcium: f64,
    ) -> (Option<NeuralSignal>, bool, f64) {
        let voltage = voltage.clamp(-200.0, 200.0);
        let factor = self.gating_factor();
        let current = self.conductance() * factor * (voltage - self.reversal_potential());
        let current = if current.is_finite() { current } else { 0.0 };
        (None, true, current)
    }

    fn gating_factor(&self) -> f64 {
        match self {
            Self::FastSodium(c) => c.gating.m.powi(3) * c.gating.h,
            Self::DelayedRectifierPotassium(c) => c.gating.m.powi(4),
            Self::LTypeCalcium(c) => c.gating.m.powi(2) * c.gating.h,
            Self::GabaA(c) => c.gating.m * c.gating.h,
        }
        .clamp(0.0, 1.0)
    }

    /// Current instantaneous state.
    pub fn state(&self) -> ChannelState {
        let (is_open, voltage, calcium) = match self {
            Self::FastSodium(c) => (c.is_open, c.last_voltage, c.last_calcium),
            Self::DelayedRectifierPotassium(c) => (c.is_open, c.last_voltage, c.last_calcium),
            Self::LTypeCalcium(c) => (c.is_open, c.last_voltage, c.last_calcium),
            Self::GabaA(c) => (c.is_open, c.last_voltage, c.last_calcium),
        };
        ChannelState {
            is_open,
            conductance: self.conductance() * self.gating_factor(),
            membrane_voltage: voltage,
            calcium_level: calcium,
        }
    }

    /// Ion this channel is selective for.
    pub fn ion_selectivity(&self) -> IonSelectivity {
        match self {
            Self::FastSodium(_) => IonSelectivity::Sodium,
            Self::DelayedRectifierPotassium(_) => IonSelectivity::Potassium,
            Self::LTypeCalcium(_) => IonSelectivity::Calcium,
            Self::GabaA(_) => IonSelectivity::Chloride,
        }
    }

    /// Nernst reversal potential in mV.
    pub fn reversal_potential(&self) -> f64 {
        match self {
            Self::FastSodium(_) => 55.0,
            Self::DelayedRectifierPotassium(_) => -90.0,
            Self::LTypeCalcium(_) => 120.0,
            Self::GabaA(_) => -70.0,
        }
    }

    /// Peak conductance, picosiemens.
    pub fn conductance(&self) -> f64 {
        match self {
            Self::FastSodium(c) => c.g_max,
            Self::DelayedRectifierPotassium(c) => c.g_max,
            Self::LTypeCalcium(c) => c.g_max,
            Self::GabaA(c) => c.g_max,
        }
    }

    /// Activation/deactivation time constants and open threshold.
    pub fn trigger(&self) -> ChannelTrigger {
        match self {
            Self::FastSodium(_) => ChannelTrigger {
                activation_tau_ms: 0.3,
                deactivation_tau_ms: 2.0,
                open_threshold: 0.5,
            },
            Self::DelayedRectifierPotassium(_) => ChannelTrigger {
                activation_tau_ms: 3.0,
                deactivation_tau_ms: 3.0,
                open_threshold: 0.5,
            },
            Self::LTypeCalcium(_) => ChannelTrigger {
                activation_tau_ms: 1.5,
                deactivation_tau_ms: 20.0,
                open_threshold: 0.4,
            },
            Self::GabaA(_) => ChannelTrigger {
                activation_tau_ms: GabaAChannel::TAU_M_MS,
                deactivation_tau_ms: GabaAChannel::TAU_DESENS_MS,
                open_threshold: 0.3,
            },
        }
    }

    /// Functional family (independent of the carried ion).
    pub fn channel_type(&self) -> ChannelType {
        match self {
            Self::FastSodium(_) => ChannelType::VoltageGatedTransient,
            Self::DelayedRectifierPotassium(_) => ChannelType::VoltageGatedSustained,
            Self::LTypeCalcium(_) => ChannelType::VoltageCalciumGated,
            Self::GabaA(_) => ChannelType::LigandGated,
        }
    }

    /// Stable name, used in `channel_contributions` maps and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FastSodium(_) => "fast_sodium",
            Self::DelayedRectifierPotassium(_) => "delayed_rectifier_potassium",
            Self::LTypeCalcium(_) => "l_type_calcium",
            Self::GabaA(_) => "gaba_a",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_finite_and_bounded(channel: &mut IonChannel, v: f64, ligand: f64, ca: f64, dt: f64) {
        let (opened, duration, probability) = channel.should_open(v, ligand, ca, dt);
        let _ = opened;
        assert!(duration.is_finite() && duration >= 0.0);
        assert!(probability.is_finite() && (0.0..=1.0).contains(&probability));
        let sig = NeuralSignal::new(1.0, nc_types::Time::ZERO);
        let (_, pass_through, current) = channel.modulate_current(&sig, v, ca);
        assert!(pass_through);
        assert!(current.is_finite());
    }

    #[test]
    fn test_extreme_voltages_never_nan() {
        for mut channel in [
            IonChannel::fast_sodium(20.0),
            IonChannel::delayed_rectifier_potassium(10.0),
            IonChannel::l_type_calcium(5.0),
            IonChannel::gaba_a(15.0),
        ] {
            assert_finite_and_bounded(&mut channel, -200.0, 0.0, 0.0, 0.0);
            assert_finite_and_bounded(&mut channel, 200.0, 1e6, 1e6, 1000.0);
        }
    }

    #[test]
    fn test_sodium_activates_faster_than_it_deactivates() {
        assert!(FastSodiumChannel::tau_m(0.0) < FastSodiumChannel::tau_h(0.0));
    }

    #[test]
    fn test_sodium_opens_on_depolarization() {
        let mut nav = IonChannel::fast_sodium(20.0);
        // Run several steps at a strongly depolarized voltage to let gates settle.
        let mut last = (false, 0.0, 0.0);
        for _ in 0..50 {
            last = nav.should_open(30.0, 0.0, 0.0, 0.1);
        }
        assert!(last.0, "sodium channel should open under sustained depolarization");
    }

    #[test]
    fn test_calcium_channel_inactivates_with_calcium() {
        let mut cav = LTypeCalciumChannel::new(5.0);
        let low = cav.h_inf(0.0);
        let high = cav.h_inf(5.0);
        assert!(high < low, "higher calcium must reduce h_inf (more inactivation)");
    }

    #[test]
    fn test_gaba_desensitizes_under_sustained_ligand() {
        let mut gaba = IonChannel::gaba_a(15.0);
        let (_, _, p0) = gaba.should_open(-70.0, 5.0, 0.0, 1.0);
        let mut last_p = p0;
        for _ in 0..200 {
            let (_, _, p) = gaba.should_open(-70.0, 5.0, 0.0, 1.0);
            last_p = p;
        }
        assert!(last_p < p0, "sustained ligand exposure should desensitize the channel");
    }

    #[test]
    fn test_current_sign_convention() {
        // GABA-A reversal is -70mV; above reversal, current should be outward (positive).
        let mut gaba = IonChannel::gaba_a(15.0);
        gaba.should_open(-50.0, 10.0, 0.0, 5.0);
        let sig = NeuralSignal::new(1.0, nc_types::Time::ZERO);
        let (_, _, current) = gaba.modulate_current(&sig, -50.0, 0.0);
        assert!(current >= 0.0);
    }
}
