use serde::Deserialize;

/// Connection state of a unit towards the public grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridMode {
    #[default]
    OnGrid,
    OffGrid,
    Undefined,
}

impl GridMode {
    /// Combined grid mode of several units.
    ///
    /// Units that agree yield their common mode. Any undefined unit, or units
    /// that disagree, yield [`GridMode::Undefined`]. An empty input is
    /// undefined as well.
    pub fn combine(modes: impl IntoIterator<Item = GridMode>) -> GridMode {
        let mut combined = None;
        for mode in modes {
            combined = match (combined, mode) {
                (_, GridMode::Undefined) => return GridMode::Undefined,
                (None, mode) => Some(mode),
                (Some(prev), mode) if prev == mode => Some(prev),
                (Some(_), _) => return GridMode::Undefined,
            };
        }
        combined.unwrap_or(GridMode::Undefined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agreeing_units_keep_their_mode() {
        assert_eq!(
            GridMode::combine([GridMode::OnGrid, GridMode::OnGrid]),
            GridMode::OnGrid
        );
        assert_eq!(
            GridMode::combine([GridMode::OffGrid, GridMode::OffGrid]),
            GridMode::OffGrid
        );
    }

    #[test]
    fn disagreement_or_unknown_is_undefined() {
        assert_eq!(
            GridMode::combine([GridMode::OnGrid, GridMode::OffGrid]),
            GridMode::Undefined
        );
        assert_eq!(
            GridMode::combine([GridMode::OffGrid, GridMode::Undefined]),
            GridMode::Undefined
        );
        assert_eq!(GridMode::combine([]), GridMode::Undefined);
    }
}
