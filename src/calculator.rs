use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Months per year; inputs are monthly quantities.
const MONTHS: f64 = 12.0;

const ELECTRICITY_FACTOR: f64 = 0.0005;
const GAS_FACTOR: f64 = 0.0053;
const FUEL_FACTOR: f64 = 2.32;
const WASTE_FACTOR: f64 = 0.57;
const TRAVEL_FACTOR: f64 = 2.31;

/// Annual CO2 from electricity, natural gas and fuel usage
///
/// Each argument is a monthly quantity. The result is annualized and
/// weighted by the fixed emission factor of its source.
///
/// # Arguments
/// * `electricity_kwh` - Monthly electricity consumption
/// * `gas_units` - Monthly natural gas consumption
/// * `fuel_units` - Monthly fuel consumption
///
/// # Returns
/// * `f64` - Kilograms of CO2-equivalent per year
///
/// # Examples
/// ```
/// use carbon_footprint::calculator::energy_usage;
///
/// let kg = energy_usage(100.0, 50.0, 0.0);
/// assert!((kg - 3.78).abs() < 1e-9);
/// ```
pub fn energy_usage(electricity_kwh: f64, gas_units: f64, fuel_units: f64) -> f64 {
    electricity_kwh * MONTHS * ELECTRICITY_FACTOR
        + gas_units * MONTHS * GAS_FACTOR
        + fuel_units * MONTHS * FUEL_FACTOR
}

/// Annual CO2 from waste, reduced by the share diverted to recycling
///
/// # Arguments
/// * `waste_units` - Monthly waste produced
/// * `recycling_percent` - Share of the waste that is recycled, 0 to 100
///
/// # Returns
/// * `f64` - Kilograms of CO2-equivalent per year
pub fn waste_impact(waste_units: f64, recycling_percent: f64) -> f64 {
    waste_units * MONTHS * WASTE_FACTOR * (1.0 - recycling_percent / 100.0)
}

/// CO2 from business travel
///
/// `fuel_efficiency` is distance per unit of fuel and must be strictly
/// positive; callers validate it before getting here.
pub fn business_travel(kilometers: f64, fuel_efficiency: f64) -> f64 {
    kilometers * (1.0 / fuel_efficiency) * TRAVEL_FACTOR
}

/// Raw submission as it arrives from a form
///
/// Every field is optional text. Missing quantities count as zero, present
/// but unparseable ones are rejected by [`SubmissionForm::parse`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionForm {
    pub name: Option<String>,
    pub year: Option<String>,
    pub electricity: Option<String>,
    pub gas: Option<String>,
    pub fuel: Option<String>,
    pub waste: Option<String>,
    pub recycling: Option<String>,
    pub kilometers: Option<String>,
    pub efficiency: Option<String>,
}

impl SubmissionForm {
    /// Parse every field into typed activity inputs
    ///
    /// This only checks that the values are numbers. Range checks happen in
    /// [`ActivityInputs::validate`].
    pub fn parse(&self) -> Result<ActivityInputs, ValidationError> {
        let name = self.name.as_deref().unwrap_or("").trim().to_string();

        let year = match self.year.as_deref().map(str::trim) {
            None | Some("") => return Err(ValidationError::MissingYear),
            Some(raw) => raw
                .parse::<i32>()
                .map_err(|_| ValidationError::NotAnInteger {
                    field: "year",
                    value: raw.to_string(),
                })?,
        };

        Ok(ActivityInputs {
            name,
            year,
            electricity: parse_quantity("electricity", &self.electricity)?,
            gas: parse_quantity("gas", &self.gas)?,
            fuel: parse_quantity("fuel", &self.fuel)?,
            waste: parse_quantity("waste", &self.waste)?,
            recycling: parse_quantity("recycling", &self.recycling)?,
            kilometers: parse_quantity("kilometers", &self.kilometers)?,
            efficiency: parse_quantity("efficiency", &self.efficiency)?,
        })
    }
}

fn parse_quantity(field: &'static str, raw: &Option<String>) -> Result<f64, ValidationError> {
    match raw {
        None => Ok(0.0),
        Some(value) => value
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::NotANumber {
                field,
                value: value.clone(),
            }),
    }
}

/// Typed activity quantities for one submitter and year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityInputs {
    pub name: String,
    pub year: i32,
    pub electricity: f64,
    pub gas: f64,
    pub fuel: f64,
    pub waste: f64,
    pub recycling: f64,
    pub kilometers: f64,
    pub efficiency: f64,
}

impl ActivityInputs {
    /// Check the ranges every formula relies on
    ///
    /// # Errors
    /// * `EmptyName` if the name is blank
    /// * `NotFinite` / `Negative` for any quantity outside `[0, inf)`
    /// * `NonPositiveEfficiency` if fuel efficiency is zero or below
    /// * `RecyclingAbove100` if more than all of the waste is recycled
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let quantities = [
            ("electricity", self.electricity),
            ("gas", self.gas),
            ("fuel", self.fuel),
            ("waste", self.waste),
            ("recycling", self.recycling),
            ("kilometers", self.kilometers),
            ("efficiency", self.efficiency),
        ];
        for (field, value) in quantities {
            if !value.is_finite() {
                return Err(ValidationError::NotFinite { field });
            }
            if value < 0.0 {
                return Err(ValidationError::Negative { field });
            }
        }

        if self.efficiency <= 0.0 {
            return Err(ValidationError::NonPositiveEfficiency);
        }
        if self.recycling > 100.0 {
            return Err(ValidationError::RecyclingAbove100);
        }

        Ok(())
    }
}

/// One computed footprint, as stored in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub name: String,
    pub year: i32,
    pub electricity_co2: f64,
    pub waste_co2: f64,
    pub travel_co2: f64,
    pub total_co2: f64,
}

impl SubmissionRecord {
    /// Field/value pairs in ledger column order, for echoing a submission back
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Name", self.name.clone()),
            ("Year", self.year.to_string()),
            ("Electricity (kg CO2)", format!("{:.2}", self.electricity_co2)),
            ("Waste (kg CO2)", format!("{:.2}", self.waste_co2)),
            ("Travel (kg CO2)", format!("{:.2}", self.travel_co2)),
            ("Total (kg CO2)", format!("{:.2}", self.total_co2)),
        ]
    }
}

/// Validate the inputs and compute the footprint record
///
/// # Examples
/// ```
/// use carbon_footprint::calculator::{compute, ActivityInputs};
///
/// let inputs = ActivityInputs {
///     name: "Acme".to_string(),
///     year: 2024,
///     electricity: 100.0,
///     gas: 50.0,
///     fuel: 0.0,
///     waste: 10.0,
///     recycling: 50.0,
///     kilometers: 200.0,
///     efficiency: 20.0,
/// };
/// let record = compute(&inputs).unwrap();
/// assert!((record.total_co2 - 61.08).abs() < 1e-9);
/// ```
pub fn compute(inputs: &ActivityInputs) -> Result<SubmissionRecord, ValidationError> {
    inputs.validate()?;

    let electricity_co2 = energy_usage(inputs.electricity, inputs.gas, inputs.fuel);
    let waste_co2 = waste_impact(inputs.waste, inputs.recycling);
    let travel_co2 = business_travel(inputs.kilometers, inputs.efficiency);

    Ok(SubmissionRecord {
        name: inputs.name.trim().to_string(),
        year: inputs.year,
        electricity_co2,
        waste_co2,
        travel_co2,
        total_co2: electricity_co2 + waste_co2 + travel_co2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn scenario() -> ActivityInputs {
        ActivityInputs {
            name: "Acme".to_string(),
            year: 2024,
            electricity: 100.0,
            gas: 50.0,
            fuel: 0.0,
            waste: 10.0,
            recycling: 50.0,
            kilometers: 200.0,
            efficiency: 20.0,
        }
    }

    #[test]
    fn energy_usage_is_linear_in_each_argument() {
        let base = energy_usage(10.0, 20.0, 3.0);
        assert!((energy_usage(20.0, 40.0, 6.0) - 2.0 * base).abs() < EPS);
        assert!(energy_usage(11.0, 20.0, 3.0) >= base);
        assert!(energy_usage(10.0, 21.0, 3.0) >= base);
        assert!(energy_usage(10.0, 20.0, 4.0) >= base);
        assert_eq!(energy_usage(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn waste_impact_bounds() {
        assert!((waste_impact(10.0, 0.0) - 10.0 * 12.0 * 0.57).abs() < EPS);
        assert!(waste_impact(10.0, 100.0).abs() < EPS);

        let mut previous = f64::INFINITY;
        for percent in [0.0, 10.0, 25.0, 50.0, 75.0, 100.0] {
            let kg = waste_impact(8.0, percent);
            assert!(kg <= previous);
            previous = kg;
        }
    }

    #[test]
    fn business_travel_reference_value() {
        assert!((business_travel(100.0, 10.0) - 23.1).abs() < EPS);
    }

    #[test]
    fn scenario_totals() {
        let record = compute(&scenario()).unwrap();
        assert!((record.electricity_co2 - 3.78).abs() < EPS);
        assert!((record.waste_co2 - 34.2).abs() < EPS);
        assert!((record.travel_co2 - 23.1).abs() < EPS);
        assert!((record.total_co2 - 61.08).abs() < EPS);
        assert!(
            (record.total_co2 - (record.electricity_co2 + record.waste_co2 + record.travel_co2))
                .abs()
                < EPS
        );
    }

    #[test]
    fn zero_efficiency_is_rejected() {
        let mut inputs = scenario();
        inputs.efficiency = 0.0;
        assert_eq!(compute(&inputs), Err(ValidationError::NonPositiveEfficiency));
    }

    #[test]
    fn negative_quantity_names_the_field() {
        let mut inputs = scenario();
        inputs.kilometers = -1.0;
        assert_eq!(
            inputs.validate(),
            Err(ValidationError::Negative {
                field: "kilometers"
            })
        );
    }

    #[test]
    fn recycling_over_100_is_rejected() {
        let mut inputs = scenario();
        inputs.recycling = 120.0;
        assert_eq!(inputs.validate(), Err(ValidationError::RecyclingAbove100));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut inputs = scenario();
        inputs.name = "   ".to_string();
        assert_eq!(inputs.validate(), Err(ValidationError::EmptyName));
    }

    #[test]
    fn form_parsing() {
        let form = SubmissionForm {
            name: Some("  Acme ".to_string()),
            year: Some("2024".to_string()),
            electricity: Some("100".to_string()),
            efficiency: Some("20".to_string()),
            ..Default::default()
        };
        let inputs = form.parse().unwrap();
        assert_eq!(inputs.name, "Acme");
        assert_eq!(inputs.year, 2024);
        assert_eq!(inputs.electricity, 100.0);
        assert_eq!(inputs.gas, 0.0);

        let bad = SubmissionForm {
            gas: Some("lots".to_string()),
            ..form.clone()
        };
        assert_eq!(
            bad.parse(),
            Err(ValidationError::NotANumber {
                field: "gas",
                value: "lots".to_string()
            })
        );

        let no_year = SubmissionForm {
            year: None,
            ..form
        };
        assert_eq!(no_year.parse(), Err(ValidationError::MissingYear));
    }
}
