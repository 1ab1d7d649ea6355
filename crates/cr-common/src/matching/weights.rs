/// Maximum points per score component. The five caps add up to 100 so the
/// total reads as a percentage.
pub const COMPONENT_WEIGHTS: ComponentWeights = ComponentWeights {
    mandatory_skills: 40.0,
    good_to_have_skills: 20.0,
    experience: 25.0,
    location: 10.0,
    salary: 5.0,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentWeights {
    pub mandatory_skills: f64,
    pub good_to_have_skills: f64,
    pub experience: f64,
    pub location: f64,
    pub salary: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        COMPONENT_WEIGHTS
    }
}

impl ComponentWeights {
    pub fn sum(&self) -> f64 {
        self.mandatory_skills + self.good_to_have_skills + self.experience + self.location + self.salary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_hundred() {
        assert!((COMPONENT_WEIGHTS.sum() - 100.0).abs() < 1e-9);
    }
}
