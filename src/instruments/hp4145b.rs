//! HP 4145B semiconductor parameter analyzer.
//!
//! The FET is wired common source: SMU2 drives the drain (VDS, measures ID),
//! SMU3 drives the gate (VGS, measures IG). A sweep has one swept variable
//! (VAR1, staircase from start to stop) and one stepped variable (VAR2, a
//! start value plus a fixed step), and the analyzer returns VAR1 points for
//! each VAR2 step, VAR2-major.

use tracing::{info, instrument};

use crate::analysis::reply::parse_values_exact;
use crate::analysis::{Axis, MeasurementMatrix};
use crate::config::{DrainSweep, GateSweep, IntegrationTime};
use crate::error::AppResult;
use crate::hardware::{SettleStrategy, Transport};

/// Source/monitor units that take no part in a FET sweep.
const UNUSED_UNITS: [&str; 6] = ["CH1", "CH4", "VS1", "VS2", "VM1", "VM2"];

/// Which terminal voltage is swept (VAR1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    /// VDS swept, VGS stepped: ID vs VDS curves
    Output,
    /// VGS swept, VDS stepped: ID vs VGS curves
    Transfer,
}

impl SweepMode {
    /// Channel name of VAR1.
    pub fn swept_name(self) -> &'static str {
        match self {
            Self::Output => "VDS",
            Self::Transfer => "VGS",
        }
    }

    /// Channel name of VAR2.
    pub fn stepped_name(self) -> &'static str {
        match self {
            Self::Output => "VGS",
            Self::Transfer => "VDS",
        }
    }
}

/// VAR1: `points` values from `start` to `stop`, both included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweptVariable {
    /// First value in volts
    pub start: f64,
    /// Last value in volts
    pub stop: f64,
    /// Number of points
    pub points: usize,
    /// Current compliance in amperes
    pub compliance: f64,
}

impl SweptVariable {
    /// Spacing of adjacent points; zero for a single point.
    pub fn step(&self) -> f64 {
        if self.points > 1 {
            (self.stop - self.start) / (self.points - 1) as f64
        } else {
            0.0
        }
    }
}

/// VAR2: `points` values `start + i * step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteppedVariable {
    /// First step in volts
    pub start: f64,
    /// Increment in volts
    pub step: f64,
    /// Number of steps
    pub points: usize,
    /// Current compliance in amperes
    pub compliance: f64,
}

/// Everything needed to program one sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    /// Which terminal is swept
    pub mode: SweepMode,
    /// VAR1
    pub swept: SweptVariable,
    /// VAR2
    pub stepped: SteppedVariable,
    /// Upper end of the ID display axis
    pub id_compliance: f64,
}

impl SweepPlan {
    /// First pass: ID vs VDS for each VGS step.
    pub fn output(drain: &DrainSweep, gate: &GateSweep) -> Self {
        Self {
            mode: SweepMode::Output,
            swept: SweptVariable {
                start: drain.start,
                stop: drain.stop,
                points: drain.points,
                compliance: drain.compliance,
            },
            stepped: SteppedVariable {
                start: gate.start,
                step: gate.step,
                points: gate.points,
                compliance: gate.compliance,
            },
            id_compliance: drain.compliance,
        }
    }

    /// Second pass: ID vs VGS over the gate range with `drain.points`
    /// points, for `gate.points` VDS steps of `(stop - start) / gate.points`
    /// starting one step above `drain.start`.
    pub fn transfer(drain: &DrainSweep, gate: &GateSweep) -> Self {
        let vds_step = (drain.stop - drain.start) / gate.points as f64;
        Self {
            mode: SweepMode::Transfer,
            swept: SweptVariable {
                start: gate.start,
                stop: gate.stop(),
                points: drain.points,
                compliance: gate.compliance,
            },
            stepped: SteppedVariable {
                start: drain.start + vds_step,
                step: vds_step,
                points: gate.points,
                compliance: drain.compliance,
            },
            id_compliance: drain.compliance,
        }
    }

    /// VAR1 values, as programmed.
    pub fn swept_axis(&self) -> AppResult<Axis> {
        Axis::linspace(self.swept.start, self.swept.stop, self.swept.points)
    }

    /// VAR2 values, as programmed.
    pub fn stepped_axis(&self) -> Axis {
        Axis::from_start_step(self.stepped.start, self.stepped.step, self.stepped.points)
    }

    /// Number of readings one `DO 'ID';` reply must hold.
    pub fn expected_readings(&self) -> usize {
        self.swept.points * self.stepped.points
    }

    /// Channel definitions, sweep source setup and display setup.
    pub fn setup_commands(&self) -> Vec<String> {
        let (drain_var, gate_var) = match self.mode {
            SweepMode::Output => (1, 2),
            SweepMode::Transfer => (2, 1),
        };
        vec![
            format!("DE,CH2,'VDS','ID',1,{};", drain_var),
            format!("DE,CH3,'VGS','IG',1,{};", gate_var),
            format!(
                "SS VR1,{:.6},{:.6},{:.6},{:.6};",
                self.swept.start,
                self.swept.stop,
                self.swept.step(),
                self.swept.compliance
            ),
            format!(
                "SS VP{:.6},{:.6},{},{:.6};",
                self.stepped.start, self.stepped.step, self.stepped.points, self.stepped.compliance
            ),
            format!(
                "SM;DM1;XN '{}',1,{:.6},{:.6};YB;YA 'ID',1,{:.6},{:.6};",
                self.mode.swept_name(),
                self.swept.start,
                self.swept.stop,
                0.0,
                self.id_compliance
            ),
        ]
    }
}

/// `IT1`, `IT2` or `IT3`.
pub fn integration_time_command(time: IntegrationTime) -> &'static str {
    match time {
        IntegrationTime::Short => "IT1",
        IntegrationTime::Medium => "IT2",
        IntegrationTime::Long => "IT3",
    }
}

/// Driver for one 4145B session.
pub struct ParameterAnalyzer {
    transport: Box<dyn Transport>,
    settle: SettleStrategy,
}

impl ParameterAnalyzer {
    /// Driver over an open link, settling with `settle` after each trigger.
    pub fn new(transport: Box<dyn Transport>, settle: SettleStrategy) -> Self {
        Self { transport, settle }
    }

    /// Query the identity string.
    pub async fn identify(&mut self) -> AppResult<String> {
        let id = self.transport.query("ID").await?;
        let id = id.trim().to_string();
        info!(identity = %id, link = %self.transport.describe(), "Connected to 4145B");
        Ok(id)
    }

    /// `*RST` then `*CLS`.
    pub async fn reset(&mut self) -> AppResult<()> {
        self.transport.write("*RST").await?;
        self.transport.write("*CLS").await
    }

    /// Program the A/D integration time.
    pub async fn set_integration_time(&mut self, time: IntegrationTime) -> AppResult<()> {
        self.transport.write(integration_time_command(time)).await
    }

    /// Switch off every unit except SMU2 and SMU3.
    pub async fn disable_unused_units(&mut self) -> AppResult<()> {
        for unit in UNUSED_UNITS {
            self.transport.write(&format!("DE,{};", unit)).await?;
        }
        Ok(())
    }

    /// Send the channel, VAR1, VAR2 and display setup of `plan`.
    pub async fn configure(&mut self, plan: &SweepPlan) -> AppResult<()> {
        info!(
            mode = ?plan.mode,
            swept_points = plan.swept.points,
            stepped_points = plan.stepped.points,
            "Setting up sweep"
        );
        for command in plan.setup_commands() {
            self.transport.write(&command).await?;
        }
        Ok(())
    }

    /// Trigger a single measurement and wait until it has finished.
    pub async fn measure(&mut self) -> AppResult<()> {
        for command in ["BC;", "DR1;", "MD ME1;"] {
            self.transport.write(command).await?;
        }
        self.settle.wait_for_data(self.transport.as_mut()).await?;
        self.transport.write("DR0;").await
    }

    /// Fetch the drain current trace, requiring exactly `expected` readings.
    pub async fn fetch_drain_current(&mut self, expected: usize) -> AppResult<Vec<f64>> {
        let reply = self.transport.query("DO 'ID';").await?;
        parse_values_exact(&reply, expected)
    }

    /// Program, trigger and read back one sweep as stepped-major series (A).
    ///
    /// The output sweep is followed by `*WAI` before the fetch; the transfer
    /// sweep is not.
    #[instrument(skip(self, plan), fields(mode = ?plan.mode))]
    pub async fn run_sweep(&mut self, plan: &SweepPlan) -> AppResult<MeasurementMatrix> {
        self.configure(plan).await?;
        self.measure().await?;
        if plan.mode == SweepMode::Output {
            self.transport.write("*WAI").await?;
        }
        let values = self.fetch_drain_current(plan.expected_readings()).await?;
        info!(readings = values.len(), "Sweep data received");
        MeasurementMatrix::from_flat(values, plan.stepped.points, plan.swept.points)
    }

    /// Return the instrument to local control and drop the link.
    pub async fn close(mut self) -> AppResult<()> {
        self.transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain() -> DrainSweep {
        DrainSweep {
            start: 0.0,
            stop: 1.0,
            points: 101,
            compliance: 100e-3,
        }
    }

    fn gate() -> GateSweep {
        GateSweep {
            start: -0.2,
            step: 0.05,
            points: 9,
            compliance: 100e-6,
        }
    }

    #[test]
    fn test_output_plan_commands() {
        let plan = SweepPlan::output(&drain(), &gate());
        assert_eq!(
            plan.setup_commands(),
            vec![
                "DE,CH2,'VDS','ID',1,1;",
                "DE,CH3,'VGS','IG',1,2;",
                "SS VR1,0.000000,1.000000,0.010000,0.100000;",
                "SS VP-0.200000,0.050000,9,0.000100;",
                "SM;DM1;XN 'VDS',1,0.000000,1.000000;YB;YA 'ID',1,0.000000,0.100000;",
            ]
        );
        assert_eq!(plan.expected_readings(), 909);
        assert_eq!(plan.swept_axis().unwrap().len(), 101);
    }

    #[test]
    fn test_transfer_plan_swaps_roles() {
        let plan = SweepPlan::transfer(&drain(), &gate());
        let commands = plan.setup_commands();
        assert_eq!(commands[0], "DE,CH2,'VDS','ID',1,2;");
        assert_eq!(commands[1], "DE,CH3,'VGS','IG',1,1;");
        assert_eq!(commands[2], "SS VR1,-0.200000,0.200000,0.004000,0.000100;");
        assert_eq!(commands[3], "SS VP0.111111,0.111111,9,0.100000;");
        assert!(commands[4].starts_with("SM;DM1;XN 'VGS',1,-0.200000,0.200000;"));

        let vgs = plan.swept_axis().unwrap();
        assert_eq!(vgs.len(), 101);
        assert!((vgs.last().unwrap() - 0.2).abs() < 1e-12);
        let vds = plan.stepped_axis();
        assert_eq!(vds.len(), 9);
        assert!((vds.last().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_integration_time_commands() {
        assert_eq!(integration_time_command(IntegrationTime::Short), "IT1");
        assert_eq!(integration_time_command(IntegrationTime::Long), "IT3");
    }
}
