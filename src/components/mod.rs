//! Component equation templates.
//!
//! Each template creates its branches through the branch constraint emitter
//! and appends its constitutive equations to the network pool:
//! - Linear: Resistor, Conductor, Capacitor, Inductor, Short
//! - Coupled: Transformer, Emf
//! - Nonlinear: Diode, ZDiode
//! - Ideal: IdealOpAmp
//! - Sources: VoltageSource, CurrentSource
//! - Hybrid: IdealSwitch, CommutingSwitch, ArcSwitch, Thyristor, IdealDiode
//!
//! Hybrid templates additionally declare a mode variable, modal equation
//! sets and the events that switch between them. They only accept scalar
//! real nodes.

mod arc;
mod controls;
mod diode;
mod linear;
mod opamp;
mod sources;
mod thyristor;
mod transformer;

pub use arc::{ArcParams, ArcSwitch};
pub use controls::{CommutingSwitch, IdealSwitch, SwitchKind};
pub use diode::{exlin, exlin_expr, exlin_slope, BreakdownParams, Diode, DiodeParams, ThermalParams, ZDiode};
pub use linear::{Capacitor, Conductor, Inductor, Resistor, Short};
pub use opamp::IdealOpAmp;
pub use sources::{CurrentSource, VoltageSource, Waveform};
pub use thyristor::{IdealDiode, Thyristor, ValveParams};
pub use transformer::{Emf, Transformer};

use crate::circuit::{
    resolve_shape, Bindings, Branch, Circuit, ClockId, ComponentId, EventId, Flange, HeatPort, ModeId, NodeRef,
};
use crate::dsl::{ComponentDef, ComponentType, ModelDef, ModelType, ParamValue};
use crate::error::{KirchhoffError, Result};
use crate::expr::Equation;
use crate::hybrid::Control;
use crate::params::Param;

/// Handles to what one template instantiation created.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub component: ComponentId,
    /// Branches in pin order
    pub branches: Vec<Branch>,
    pub mode: Option<ModeId>,
    pub clock: Option<ClockId>,
    pub events: Vec<EventId>,
}

impl Instance {
    pub fn new(component: ComponentId, branches: Vec<Branch>) -> Self {
        Self {
            component,
            branches,
            mode: None,
            clock: None,
            events: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: ModeId) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_clock(mut self, clock: ClockId) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_events(mut self, events: Vec<EventId>) -> Self {
        self.events = events;
        self
    }
}

/// Fail with `NotVectorizable` unless all pins resolve to a real scalar.
pub(crate) fn require_scalar(circuit: &Circuit, component: ComponentId, pins: &[NodeRef]) -> Result<()> {
    let name = circuit.component_name(component);
    let shape = resolve_shape(pins).map_err(|e| KirchhoffError::shape_mismatch(name, e))?;
    if shape.is_scalar() {
        Ok(())
    } else {
        Err(KirchhoffError::NotVectorizable {
            component: name.to_string(),
            shape,
        })
    }
}

/// Closed resistance and open conductance, falling back to the network defaults.
pub(crate) fn switch_limits(circuit: &Circuit, ron: Option<f64>, goff: Option<f64>) -> (f64, f64) {
    let config = circuit.config();
    (ron.unwrap_or(config.ron), goff.unwrap_or(config.goff))
}

/// Whether a switch control is on at t=0.
///
/// Level controls are assumed off; their signal is only known once the
/// solver has an initial point.
pub(crate) fn control_initially_on(circuit: &Circuit, control: &Control) -> bool {
    match control {
        Control::Input(id) => circuit.control_initial(*id),
        Control::Level { .. } => false,
    }
}

/// `v = Ron * i`
pub(crate) fn closed_equation(branch: &Branch, ron: f64) -> Equation {
    Equation::new(branch.v(), ron * branch.i())
}

/// `i = Goff * v`
pub(crate) fn open_equation(branch: &Branch, goff: f64) -> Equation {
    Equation::new(branch.i(), goff * branch.v())
}

/// A configured template, ready to be instantiated on a list of pins.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Resistor(Resistor),
    Conductor(Conductor),
    Capacitor(Capacitor),
    Inductor(Inductor),
    Short(Short),
    Transformer(Transformer),
    Emf(Emf),
    Diode(Diode),
    ZDiode(ZDiode),
    OpAmp(IdealOpAmp),
    VoltageSource(VoltageSource),
    CurrentSource(CurrentSource),
    Switch(IdealSwitch),
    CommutingSwitch(CommutingSwitch),
    ArcSwitch(ArcSwitch),
    Thyristor(Thyristor),
    IdealDiode(IdealDiode),
}

impl Component {
    /// Template name, as recorded in the network.
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Resistor(_) => "Resistor",
            Component::Conductor(_) => "Conductor",
            Component::Capacitor(_) => "Capacitor",
            Component::Inductor(_) => "Inductor",
            Component::Short(_) => "Short",
            Component::Transformer(_) => "Transformer",
            Component::Emf(_) => "Emf",
            Component::Diode(_) => "Diode",
            Component::ZDiode(_) => "ZDiode",
            Component::OpAmp(_) => "IdealOpAmp",
            Component::VoltageSource(_) => "VoltageSource",
            Component::CurrentSource(_) => "CurrentSource",
            Component::Switch(_) => "IdealSwitch",
            Component::CommutingSwitch(_) => "CommutingSwitch",
            Component::ArcSwitch(_) => "ArcSwitch",
            Component::Thyristor(t) if t.gto => "GtoThyristor",
            Component::Thyristor(_) => "Thyristor",
            Component::IdealDiode(_) => "IdealDiode",
        }
    }

    /// True if the template declares discrete modes.
    pub fn is_hybrid(&self) -> bool {
        matches!(
            self,
            Component::Switch(_)
                | Component::CommutingSwitch(_)
                | Component::ArcSwitch(_)
                | Component::Thyristor(_)
                | Component::IdealDiode(_)
        )
    }

    /// True if the template accepts array and complex nodes.
    pub fn is_vectorizable(&self) -> bool {
        match self {
            Component::VoltageSource(s) => s.waveform.is_vectorizable(),
            Component::CurrentSource(s) => s.waveform.is_vectorizable(),
            _ => !self.is_hybrid(),
        }
    }

    /// Accepted number of pins, as `(min, max)`.
    pub fn pin_count(&self) -> (usize, usize) {
        match self {
            Component::Transformer(_) => (4, 4),
            Component::CommutingSwitch(_) => (3, 3),
            Component::OpAmp(_) => (3, 4),
            _ => (2, 2),
        }
    }

    /// Instantiate the template on `pins`.
    pub fn build(&self, circuit: &mut Circuit, name: &str, pins: &[NodeRef]) -> Result<Instance> {
        let (min, max) = self.pin_count();
        if pins.len() < min || pins.len() > max {
            return Err(KirchhoffError::InvalidTopology {
                message: format!(
                    "{} '{}' takes {} pins, got {}",
                    self.kind(),
                    name,
                    if min == max { min.to_string() } else { format!("{} to {}", min, max) },
                    pins.len()
                ),
            });
        }

        let (p, n) = (pins[0], pins[1]);
        match self {
            Component::Resistor(c) => c.build(circuit, name, p, n),
            Component::Conductor(c) => c.build(circuit, name, p, n),
            Component::Capacitor(c) => c.build(circuit, name, p, n),
            Component::Inductor(c) => c.build(circuit, name, p, n),
            Component::Short(c) => c.build(circuit, name, p, n),
            Component::Transformer(c) => c.build(circuit, name, p, n, pins[2], pins[3]),
            Component::Emf(c) => c.build(circuit, name, p, n),
            Component::Diode(c) => c.build(circuit, name, p, n),
            Component::ZDiode(c) => c.build(circuit, name, p, n),
            Component::OpAmp(c) if pins.len() == 4 => c.build(circuit, name, p, n, pins[2], pins[3]),
            Component::OpAmp(c) => c.build_grounded(circuit, name, p, n, pins[2]),
            Component::VoltageSource(c) => c.build(circuit, name, p, n),
            Component::CurrentSource(c) => c.build(circuit, name, p, n),
            Component::Switch(c) => c.build(circuit, name, p, n),
            Component::CommutingSwitch(c) => c.build(circuit, name, p, n, pins[2]),
            Component::ArcSwitch(c) => c.build(circuit, name, p, n),
            Component::Thyristor(c) => c.build(circuit, name, p, n),
            Component::IdealDiode(c) => c.build(circuit, name, p, n),
        }
    }

    /// Create a component from a netlist definition.
    ///
    /// `model` is the `.model` the definition refers to, if any; `bindings`
    /// resolves names of inputs, controls, heat ports and flanges.
    pub fn from_def(def: &ComponentDef, model: Option<&ModelDef>, bindings: &Bindings) -> Result<Self> {
        let reader = DefReader { def, model, bindings };
        let component = match def.component_type {
            ComponentType::Resistor => {
                let mut resistor = Resistor::new(reader.value("resistance")?);
                resistor.alpha = reader.number("alpha")?.unwrap_or(0.0);
                resistor.t_ref = reader.number("tref")?;
                resistor.temperature = reader.param("temp")?;
                resistor.heat_port = reader.heat_port()?;
                Component::Resistor(resistor)
            }
            ComponentType::Conductor => Component::Conductor(Conductor::new(reader.value("conductance")?)),
            ComponentType::Capacitor => {
                let mut capacitor = Capacitor::new(reader.value("capacitance")?);
                capacitor.v0 = reader.number("ic")?;
                Component::Capacitor(capacitor)
            }
            ComponentType::Inductor => {
                let mut inductor = Inductor::new(reader.value("inductance")?);
                inductor.i0 = reader.number("ic")?;
                Component::Inductor(inductor)
            }
            ComponentType::Short => Component::Short(Short),
            ComponentType::Transformer => Component::Transformer(Transformer::new(
                reader.require("l1")?,
                reader.require("l2")?,
                reader.require("m")?,
            )),
            ComponentType::Emf => {
                let k = match def.value {
                    Some(k) => k,
                    None => reader
                        .number("k")?
                        .ok_or_else(|| reader.invalid("emf requires a constant k"))?,
                };
                Component::Emf(Emf::new(k, reader.flange()?))
            }
            ComponentType::Diode => {
                let model = reader.diode_model()?;
                let params = model.map(DiodeParams::from_model).unwrap_or_default();
                let diode = Diode::new(params);
                match reader.heat_port()? {
                    Some(port) => {
                        let thermal = model.map(ThermalParams::from_model).unwrap_or_default();
                        Component::Diode(diode.with_heat_port(port, thermal))
                    }
                    None => Component::Diode(diode),
                }
            }
            ComponentType::ZDiode => Component::ZDiode(match reader.diode_model()? {
                Some(model) => ZDiode::from_model(model),
                None => ZDiode::default(),
            }),
            ComponentType::OpAmp => Component::OpAmp(IdealOpAmp),
            ComponentType::VoltageSource => Component::VoltageSource(VoltageSource::new(reader.waveform()?)),
            ComponentType::CurrentSource => Component::CurrentSource(CurrentSource::new(reader.waveform()?)),
            ComponentType::Opener | ComponentType::Closer => {
                let control = reader.control()?;
                let switch = if def.component_type == ComponentType::Opener {
                    IdealSwitch::opener(control)
                } else {
                    IdealSwitch::closer(control)
                };
                Component::Switch(IdealSwitch {
                    ron: reader.number("ron")?,
                    goff: reader.number("goff")?,
                    ..switch
                })
            }
            ComponentType::CommutingSwitch => Component::CommutingSwitch(CommutingSwitch {
                ron: reader.number("ron")?,
                goff: reader.number("goff")?,
                ..CommutingSwitch::new(reader.control()?)
            }),
            ComponentType::ArcOpener | ComponentType::ArcCloser => {
                let control = reader.control()?;
                let switch = if def.component_type == ComponentType::ArcOpener {
                    ArcSwitch::opener(control)
                } else {
                    ArcSwitch::closer(control)
                };
                if let Some(model) = reader.model.filter(|m| m.model_type != ModelType::Arc) {
                    return Err(reader.invalid(format!("model '{}' is not an arc model", model.name)));
                }
                let defaults = ArcParams::default();
                let arc = ArcParams {
                    v0: reader.number("v0")?.unwrap_or(defaults.v0),
                    dvdt: reader.number("dvdt")?.unwrap_or(defaults.dvdt),
                    vmax: reader.number("vmax")?.unwrap_or(defaults.vmax),
                };
                Component::ArcSwitch(ArcSwitch {
                    ron: reader.number("ron")?,
                    goff: reader.number("goff")?,
                    ..switch.with_arc(arc)
                })
            }
            ComponentType::Thyristor | ComponentType::Gto => {
                let control = reader.control()?;
                let thyristor = if def.component_type == ComponentType::Gto {
                    Thyristor::gto(control)
                } else {
                    Thyristor::new(control)
                };
                Component::Thyristor(thyristor.with_params(reader.valve()?))
            }
            ComponentType::IdealDiode => Component::IdealDiode(IdealDiode::new(reader.valve()?)),
        };
        Ok(component)
    }
}

/// Reads typed values out of a netlist definition.
struct DefReader<'a> {
    def: &'a ComponentDef,
    model: Option<&'a ModelDef>,
    bindings: &'a Bindings,
}

impl<'a> DefReader<'a> {
    fn invalid(&self, message: impl Into<String>) -> KirchhoffError {
        KirchhoffError::invalid_component(&self.def.name, self.def.line, message)
    }

    fn bad_param(&self, param: &str, message: impl Into<String>) -> KirchhoffError {
        KirchhoffError::InvalidParameter {
            component: self.def.name.clone(),
            param: param.to_string(),
            message: message.into(),
        }
    }

    /// A numeric `key=value`, falling back to the model.
    fn number(&self, key: &str) -> Result<Option<f64>> {
        match self.def.params.get(key) {
            Some(ParamValue::Number(v)) => Ok(Some(*v)),
            Some(ParamValue::Name(name)) => Err(self.bad_param(key, format!("expected a number, got '{}'", name))),
            None => Ok(self.model.and_then(|m| m.params.get(key).copied())),
        }
    }

    fn input(&self, key: &str, name: &str) -> Result<Param> {
        self.bindings
            .inputs
            .get(name)
            .map(|id| Param::Signal(*id))
            .ok_or_else(|| self.bad_param(key, format!("unknown input '{}'", name)))
    }

    /// A `key=value` that may name an input signal.
    fn param(&self, key: &str) -> Result<Option<Param>> {
        match self.def.params.get(key) {
            Some(ParamValue::Number(v)) => Ok(Some(Param::Constant(*v))),
            Some(ParamValue::Name(name)) => self.input(key, name).map(Some),
            None => Ok(None),
        }
    }

    fn require(&self, key: &str) -> Result<Param> {
        self.param(key)?
            .ok_or_else(|| self.invalid(format!("missing parameter '{}'", key)))
    }

    /// The positional value: a number, or the name of an input signal.
    fn value(&self, what: &str) -> Result<Param> {
        match (&self.def.value, &self.def.reference) {
            (Some(v), _) => Ok(Param::Constant(*v)),
            (None, Some(name)) => self.input(what, name),
            (None, None) => Err(self.invalid(format!("{} requires a value", what))),
        }
    }

    fn diode_model(&self) -> Result<Option<&'a ModelDef>> {
        match self.model {
            Some(model) if !matches!(model.model_type, ModelType::Diode | ModelType::ZDiode) => Err(
                self.invalid(format!("model '{}' is not a diode model", model.name)),
            ),
            model => Ok(model),
        }
    }

    fn heat_port(&self) -> Result<Option<HeatPort>> {
        match self.def.params.get("heat") {
            Some(ParamValue::Name(name)) => self
                .bindings
                .heat_ports
                .get(name)
                .copied()
                .map(Some)
                .ok_or_else(|| self.bad_param("heat", format!("unknown heat port '{}'", name))),
            Some(ParamValue::Number(_)) => Err(self.bad_param("heat", "expected a heat port name")),
            None => Ok(None),
        }
    }

    fn flange(&self) -> Result<Flange> {
        match self.def.params.get("flange") {
            Some(ParamValue::Name(name)) => self
                .bindings
                .flanges
                .get(name)
                .copied()
                .ok_or_else(|| self.bad_param("flange", format!("unknown flange '{}'", name))),
            _ => Err(self.invalid("requires flange=<name>")),
        }
    }

    /// `control=NAME` (or `fire=NAME`) for a boolean control, or
    /// `signal=NAME level=X` for a level crossing.
    fn control(&self) -> Result<Control> {
        let named = self.def.params.get("control").or_else(|| self.def.params.get("fire"));
        if let Some(value) = named {
            return match value {
                ParamValue::Name(name) => self
                    .bindings
                    .controls
                    .get(name)
                    .map(|id| Control::Input(*id))
                    .ok_or_else(|| self.bad_param("control", format!("unknown control '{}'", name))),
                ParamValue::Number(_) => Err(self.bad_param("control", "expected a control name")),
            };
        }
        match self.param("signal")? {
            Some(signal) => Ok(Control::Level {
                signal: signal.to_expr(),
                level: self.number("level")?.unwrap_or(0.5),
            }),
            None => Err(self.invalid("requires control=<name> or signal=<input>")),
        }
    }

    fn valve(&self) -> Result<ValveParams> {
        Ok(ValveParams {
            vknee: self.number("vknee")?.unwrap_or(0.0),
            ron: self.number("ron")?,
            goff: self.number("goff")?,
        })
    }

    fn waveform(&self) -> Result<Waveform> {
        let number = |key: &str, default: f64| -> Result<f64> { Ok(self.number(key)?.unwrap_or(default)) };
        let reference = self.def.reference.as_deref().map(str::to_ascii_uppercase);
        match reference.as_deref() {
            Some("SINE") | Some("SIN") => Ok(Waveform::Sine {
                amplitude: match self.def.value {
                    Some(v) => v,
                    None => number("amp", 1.0)?,
                },
                frequency: number("freq", 1.0)?,
                phase: number("phase", 0.0)?,
                offset: number("offset", 0.0)?,
                start: number("start", 0.0)?,
            }),
            Some("STEP") => Ok(Waveform::Step {
                height: match self.def.value {
                    Some(v) => v,
                    None => number("height", 1.0)?,
                },
                offset: number("offset", 0.0)?,
                start: number("start", 0.0)?,
            }),
            Some("DC") | None => Ok(Waveform::Constant(self.def.value.unwrap_or(0.0))),
            Some(_) => match self.value("waveform")? {
                Param::Signal(id) => Ok(Waveform::Signal(id)),
                other => Ok(Waveform::Constant(other.as_constant().unwrap_or(0.0))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Shape;
    use crate::dsl;

    fn single(netlist: &str) -> ComponentDef {
        dsl::parse(netlist).unwrap().components.remove(0)
    }

    #[test]
    fn test_vectorizable_classification() {
        let mut bindings = Bindings::default();
        bindings.controls.insert("c".to_string(), crate::circuit::ControlId(0));

        let resistor = Component::from_def(&single("R1 a b 10"), None, &bindings).unwrap();
        assert!(resistor.is_vectorizable());
        assert!(!resistor.is_hybrid());

        let switch = Component::from_def(&single("SWO S1 a b control=c"), None, &bindings).unwrap();
        assert!(switch.is_hybrid());
        assert!(!switch.is_vectorizable());

        let step = Component::from_def(&single("V1 a 0 STEP 5 start=1"), None, &bindings).unwrap();
        assert!(!step.is_vectorizable());
        assert!(!step.is_hybrid());
    }

    #[test]
    fn test_build_checks_pin_count() {
        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(None, None);
        let err = Component::Resistor(Resistor::new(1.0))
            .build(&mut circuit, "R1", &[a])
            .unwrap_err();
        assert!(matches!(err, KirchhoffError::InvalidTopology { .. }));

        let out = circuit.new_scalar(None, None);
        let inst = Component::OpAmp(IdealOpAmp)
            .build(&mut circuit, "OP1", &[a, NodeRef::GROUND, out])
            .unwrap();
        assert_eq!(inst.branches.len(), 2);
    }

    #[test]
    fn test_require_scalar() {
        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(None, None);
        let z = circuit.new_complex(None, None);
        let id = circuit.begin_component("X1", "Test").unwrap();
        assert!(require_scalar(&circuit, id, &[a, NodeRef::GROUND]).is_ok());
        let err = require_scalar(&circuit, id, &[a, z]).unwrap_err();
        assert!(matches!(
            err,
            KirchhoffError::NotVectorizable {
                shape: Shape::Complex(1),
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_control_name() {
        let err = Component::from_def(&single("THY T1 a k fire=nope"), None, &Bindings::default()).unwrap_err();
        assert!(matches!(err, KirchhoffError::InvalidParameter { ref param, .. } if param == "control"));
    }

    #[test]
    fn test_sine_source_from_def() {
        let component = Component::from_def(
            &single("V1 a 0 SINE amp=2 freq=50 offset=1"),
            None,
            &Bindings::default(),
        )
        .unwrap();
        match component {
            Component::VoltageSource(source) => {
                assert_eq!(source.waveform.value_at(0.0), Some(1.0));
                assert_eq!(
                    source.waveform,
                    Waveform::Sine {
                        amplitude: 2.0,
                        frequency: 50.0,
                        phase: 0.0,
                        offset: 1.0,
                        start: 0.0,
                    }
                );
            }
            other => panic!("expected a voltage source, got {:?}", other),
        }
    }
}
