use serde::Serialize;
use thiserror::Error;

const NEWTON_START: f64 = 0.1;
const NEWTON_MAX_ITERATIONS: usize = 100;
const BISECTION_BOUNDS: (f64, f64) = (-0.9999, 10.0);
const BISECTION_MAX_ITERATIONS: usize = 200;
const TOLERANCE: f64 = 1e-10;
pub const MAX_YEARS: u32 = 100;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum IrrError {
    #[error("cash flows never change sign, so no rate sets the NPV to zero")]
    NoSignChange,

    #[error("rate search did not converge within {iterations} iterations")]
    DidNotConverge { iterations: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("projection needs at least one year")]
    NoYears,

    #[error("projection horizon of {years} years exceeds the {max}-year limit")]
    TooManyYears { years: u32, max: u32 },

    #[error("discount rate {0} must be greater than -100%")]
    DiscountRate(f64),

    #[error("{field} must be a finite, non-negative amount (got {value})")]
    Amount { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectionInputs {
    pub initial_investment: f64,
    pub annual_revenue: f64,
    pub annual_costs: f64,
    pub years: u32,
    pub discount_rate: f64,
}

impl Default for ProjectionInputs {
    fn default() -> Self {
        Self {
            initial_investment: 500_000.0,
            annual_revenue: 300_000.0,
            annual_costs: 200_000.0,
            years: 5,
            discount_rate: 0.10,
        }
    }
}

impl ProjectionInputs {
    pub fn validate(&self) -> Result<(), InputError> {
        for (field, value) in [
            ("initial investment", self.initial_investment),
            ("annual revenue", self.annual_revenue),
            ("annual costs", self.annual_costs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(InputError::Amount { field, value });
            }
        }
        if self.years == 0 {
            return Err(InputError::NoYears);
        }
        if self.years > MAX_YEARS {
            return Err(InputError::TooManyYears {
                years: self.years,
                max: MAX_YEARS,
            });
        }
        if !self.discount_rate.is_finite() || self.discount_rate <= -1.0 {
            return Err(InputError::DiscountRate(self.discount_rate));
        }
        Ok(())
    }

    /// Same projection with revenue scaled by `1 + change`.
    pub fn with_revenue_change(&self, change: f64) -> Self {
        Self {
            annual_revenue: self.annual_revenue * (1.0 + change),
            ..*self
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CashFlowProjection {
    pub inputs: ProjectionInputs,
    /// Period 0 is the investment, then one net flow per year.
    pub cash_flows: Vec<f64>,
    pub npv: f64,
    pub irr: Result<f64, IrrError>,
}

impl CashFlowProjection {
    pub fn cumulative(&self) -> Vec<f64> {
        self.cash_flows
            .iter()
            .scan(0.0, |running, flow| {
                *running += flow;
                Some(*running)
            })
            .collect()
    }

    /// First period whose cumulative cash flow is no longer negative.
    pub fn payback_period(&self) -> Option<usize> {
        self.cumulative().iter().position(|total| *total >= 0.0)
    }
}

pub fn cash_flows(inputs: &ProjectionInputs) -> Vec<f64> {
    let net = inputs.annual_revenue - inputs.annual_costs;
    std::iter::once(-inputs.initial_investment)
        .chain(std::iter::repeat(net).take(inputs.years as usize))
        .collect()
}

pub fn npv(cash_flows: &[f64], rate: f64) -> f64 {
    let factor = 1.0 + rate;
    cash_flows
        .iter()
        .enumerate()
        .map(|(t, flow)| flow / factor.powi(t as i32))
        .sum()
}

fn npv_derivative(cash_flows: &[f64], rate: f64) -> f64 {
    let factor = 1.0 + rate;
    cash_flows
        .iter()
        .enumerate()
        .skip(1)
        .map(|(t, flow)| -(t as f64) * flow / factor.powi(t as i32 + 1))
        .sum()
}

/// Rate at which the NPV of `cash_flows` is zero.
///
/// Newton's method from 10% handles the usual investment-then-returns shape;
/// when it wanders out of range or stalls the search falls back to bisection
/// over `[-99.99%, 1000%]`.
pub fn irr(cash_flows: &[f64]) -> Result<f64, IrrError> {
    let has_positive = cash_flows.iter().any(|flow| *flow > 0.0);
    let has_negative = cash_flows.iter().any(|flow| *flow < 0.0);
    if !(has_positive && has_negative) {
        return Err(IrrError::NoSignChange);
    }

    if let Some(rate) = newton(cash_flows) {
        return Ok(rate);
    }
    bisection(cash_flows)
}

fn newton(cash_flows: &[f64]) -> Option<f64> {
    let mut rate = NEWTON_START;
    for _ in 0..NEWTON_MAX_ITERATIONS {
        let value = npv(cash_flows, rate);
        let slope = npv_derivative(cash_flows, rate);
        if slope == 0.0 || !slope.is_finite() {
            return None;
        }
        let next = rate - value / slope;
        if !next.is_finite() || next <= -1.0 {
            return None;
        }
        if (next - rate).abs() < TOLERANCE {
            return Some(next);
        }
        rate = next;
    }
    None
}

fn bisection(cash_flows: &[f64]) -> Result<f64, IrrError> {
    let (mut low, mut high) = BISECTION_BOUNDS;
    let mut low_value = npv(cash_flows, low);
    let high_value = npv(cash_flows, high);
    if low_value == 0.0 {
        return Ok(low);
    }
    if high_value == 0.0 {
        return Ok(high);
    }
    if low_value.signum() == high_value.signum() {
        return Err(IrrError::NoSignChange);
    }

    for _ in 0..BISECTION_MAX_ITERATIONS {
        let mid = (low + high) / 2.0;
        let mid_value = npv(cash_flows, mid);
        if mid_value == 0.0 || (high - low) / 2.0 < TOLERANCE {
            return Ok(mid);
        }
        if mid_value.signum() == low_value.signum() {
            low = mid;
            low_value = mid_value;
        } else {
            high = mid;
        }
    }
    Err(IrrError::DidNotConverge {
        iterations: BISECTION_MAX_ITERATIONS,
    })
}

pub fn simulate(inputs: &ProjectionInputs) -> CashFlowProjection {
    let cash_flows = cash_flows(inputs);
    let npv = npv(&cash_flows, inputs.discount_rate);
    let irr = irr(&cash_flows);
    CashFlowProjection {
        inputs: *inputs,
        cash_flows,
        npv,
        irr,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensitivityPoint {
    /// Fractional revenue change, e.g. `-0.2` for -20%.
    pub revenue_change: f64,
    pub npv: f64,
}

/// NPV for revenue moved by `-steps*step ..= +steps*step`.
pub fn sensitivity(inputs: &ProjectionInputs, steps: i32, step: f64) -> Vec<SensitivityPoint> {
    (-steps..=steps)
        .map(|idx| {
            let revenue_change = f64::from(idx) * step;
            let flows = cash_flows(&inputs.with_revenue_change(revenue_change));
            SensitivityPoint {
                revenue_change,
                npv: npv(&flows, inputs.discount_rate),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cash_flows_start_with_the_investment() {
        let inputs = ProjectionInputs::default();
        let flows = cash_flows(&inputs);
        assert_eq!(flows.len(), inputs.years as usize + 1);
        assert_eq!(flows[0], -500_000.0);
        assert!(flows[1..].iter().all(|flow| *flow == 100_000.0));
    }

    #[test]
    fn default_npv_matches_annuity_closed_form() {
        let projection = simulate(&ProjectionInputs::default());
        let closed_form = -500_000.0 + 100_000.0 * (1.0 - 1.1_f64.powi(-5)) / 0.1;
        assert!((projection.npv - closed_form).abs() < 1e-6);
        assert!((projection.npv - (-120_921.32)).abs() < 0.01);
    }

    #[test]
    fn default_irr_is_zero_because_flows_only_break_even() {
        let projection = simulate(&ProjectionInputs::default());
        let rate = projection.irr.expect("irr converges");
        assert!(rate.abs() < 1e-8, "got {rate}");
        assert_eq!(projection.payback_period(), Some(5));
    }

    #[test]
    fn irr_sets_npv_to_zero() {
        let flows = [-1_000.0, 300.0, 400.0, 500.0, 200.0];
        let rate = irr(&flows).expect("irr converges");
        assert!(npv(&flows, rate).abs() < 1e-6);
        assert!(rate > 0.0);
    }

    #[test]
    fn irr_without_sign_change_is_an_error() {
        assert_eq!(irr(&[100.0, 200.0]), Err(IrrError::NoSignChange));
        assert_eq!(irr(&[-100.0, 0.0]), Err(IrrError::NoSignChange));
        assert_eq!(irr(&[]), Err(IrrError::NoSignChange));
    }

    #[test]
    fn bisection_finds_rates_newton_cannot_start_near() {
        // A huge return in year one sits far from the 10% starting point.
        let flows = [-1.0, 9.0];
        let rate = irr(&flows).expect("irr converges");
        assert!((rate - 8.0).abs() < 1e-6);
        assert!((bisection(&flows).expect("bisection converges") - 8.0).abs() < 1e-6);
    }

    #[test]
    fn npv_decreases_as_discount_rate_rises() {
        let flows = cash_flows(&ProjectionInputs::default());
        let rates = [0.0, 0.05, 0.1, 0.2, 0.5];
        let values: Vec<f64> = rates.iter().map(|rate| npv(&flows, *rate)).collect();
        assert!(values.windows(2).all(|pair| pair[1] < pair[0]));
    }

    #[test]
    fn sensitivity_grid_is_exact_and_monotonic() {
        let points = sensitivity(&ProjectionInputs::default(), 2, 0.1);
        assert_eq!(points.len(), 5);
        assert_eq!(points[2].revenue_change, 0.0);
        assert!((points[0].revenue_change + 0.2).abs() < 1e-12);
        assert!(points.windows(2).all(|pair| pair[1].npv > pair[0].npv));
    }

    #[test]
    fn payback_is_none_when_never_recovered() {
        let inputs = ProjectionInputs {
            annual_revenue: 150_000.0,
            ..ProjectionInputs::default()
        };
        assert_eq!(simulate(&inputs).payback_period(), None);
    }

    #[test]
    fn validation_rejects_nonsense_inputs() {
        let zero_years = ProjectionInputs {
            years: 0,
            ..ProjectionInputs::default()
        };
        assert_eq!(zero_years.validate(), Err(InputError::NoYears));

        let bad_rate = ProjectionInputs {
            discount_rate: -1.0,
            ..ProjectionInputs::default()
        };
        assert!(matches!(bad_rate.validate(), Err(InputError::DiscountRate(_))));

        let negative = ProjectionInputs {
            annual_costs: -5.0,
            ..ProjectionInputs::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(InputError::Amount { field: "annual costs", .. })
        ));
        assert!(ProjectionInputs::default().validate().is_ok());
    }

    #[test]
    fn horizon_is_capped() {
        let longest = ProjectionInputs {
            years: MAX_YEARS,
            ..ProjectionInputs::default()
        };
        assert!(longest.validate().is_ok());

        let too_long = ProjectionInputs {
            years: u32::MAX,
            ..ProjectionInputs::default()
        };
        assert_eq!(
            too_long.validate(),
            Err(InputError::TooManyYears {
                years: u32::MAX,
                max: MAX_YEARS
            })
        );
    }
}
