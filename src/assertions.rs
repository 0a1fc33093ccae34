use crate::error::HubError;
use crate::search::SearchParameters;
use crate::solution::Solution;

/// Checks that local search can start from solution.
///
/// # Errors
/// [HubError::NoHubs] if the solution has no hubs, e.g. because the clustering labelled every
/// point as noise.
pub(crate) fn assert_searchable(solution: &Solution) -> Result<(), HubError> {
    if !solution.has_hubs() {
        return Err(HubError::NoHubs);
    }
    Ok(())
}

/// Checks the parameters of simulated annealing.
///
/// # Errors
/// [HubError::InvalidSearchParameters] if one of the following does not hold:
/// * initial_temp must be a positive finite number;
/// * cooling_rate must lie strictly between 0 and 1.
pub(crate) fn assert_annealing_parameters(params: &SearchParameters) -> Result<(), HubError> {
    if !(params.initial_temp > 0.0 && params.initial_temp.is_finite()) {
        return Err(HubError::InvalidSearchParameters(format!(
            "the initial temperature must be positive, got {}",
            params.initial_temp
        )));
    }
    if !(params.cooling_rate > 0.0 && params.cooling_rate < 1.0) {
        return Err(HubError::InvalidSearchParameters(format!(
            "the cooling rate must lie in (0, 1), got {}",
            params.cooling_rate
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annealing_parameters() {
        assert!(assert_annealing_parameters(&SearchParameters::default()).is_ok());
        for (initial_temp, cooling_rate) in [(0.0, 0.5), (f64::INFINITY, 0.5), (10.0, 1.0), (10.0, 0.0), (10.0, f64::NAN)] {
            let params = SearchParameters { iterations: 10, initial_temp, cooling_rate };
            assert!(matches!(
                assert_annealing_parameters(&params),
                Err(HubError::InvalidSearchParameters(_))
            ));
        }
    }
}
