//! Billing plans, metered categories and the static entitlement table.

use serde::{Deserialize, Serialize};

/// Billing plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Basic => "basic",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "basic" => Plan::Basic,
            "pro" => Plan::Pro,
            "enterprise" => Plan::Enterprise,
            _ => Plan::Free,
        }
    }

    pub const ALL: [Plan; 4] = [Plan::Free, Plan::Basic, Plan::Pro, Plan::Enterprise];
}

/// Metered operation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Hook,
    Script,
    Shotlist,
    Voiceover,
    Caption,
    Broll,
    Calendar,
    Export,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Hook => "hook",
            Category::Script => "script",
            Category::Shotlist => "shotlist",
            Category::Voiceover => "voiceover",
            Category::Caption => "caption",
            Category::Broll => "broll",
            Category::Calendar => "calendar",
            Category::Export => "export",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "hook" => Some(Category::Hook),
            "script" => Some(Category::Script),
            "shotlist" => Some(Category::Shotlist),
            "voiceover" => Some(Category::Voiceover),
            "caption" => Some(Category::Caption),
            "broll" => Some(Category::Broll),
            "calendar" => Some(Category::Calendar),
            "export" => Some(Category::Export),
            _ => None,
        }
    }

    pub const ALL: [Category; 8] = [
        Category::Hook,
        Category::Script,
        Category::Shotlist,
        Category::Voiceover,
        Category::Caption,
        Category::Broll,
        Category::Calendar,
        Category::Export,
    ];
}

/// Per-plan monthly ceilings. `UNLIMITED` (-1) disables the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub hook_per_month: i64,
    pub script_per_month: i64,
    pub shotlist_per_month: i64,
    pub voiceover_per_month: i64,
    pub caption_per_month: i64,
    pub broll_per_month: i64,
    pub calendar_per_month: i64,
    pub exports_per_month: i64,
}

/// Sentinel for an uncapped category.
pub const UNLIMITED: i64 = -1;

impl PlanLimits {
    /// Ceiling for one category. Total over every category.
    pub fn limit_for(&self, category: Category) -> i64 {
        match category {
            Category::Hook => self.hook_per_month,
            Category::Script => self.script_per_month,
            Category::Shotlist => self.shotlist_per_month,
            Category::Voiceover => self.voiceover_per_month,
            Category::Caption => self.caption_per_month,
            Category::Broll => self.broll_per_month,
            Category::Calendar => self.calendar_per_month,
            Category::Export => self.exports_per_month,
        }
    }
}

/// Entitlement table. Total and pure over every known plan; an unknown plan
/// cannot occur because `Plan` is a closed enum.
pub fn limits(plan: Plan) -> PlanLimits {
    match plan {
        Plan::Free => PlanLimits {
            hook_per_month: 5,
            script_per_month: 3,
            shotlist_per_month: 3,
            voiceover_per_month: 3,
            caption_per_month: 5,
            broll_per_month: 3,
            calendar_per_month: 1,
            exports_per_month: 2,
        },
        Plan::Basic => PlanLimits {
            hook_per_month: 50,
            script_per_month: 30,
            shotlist_per_month: 30,
            voiceover_per_month: 30,
            caption_per_month: 50,
            broll_per_month: 30,
            calendar_per_month: 5,
            exports_per_month: 20,
        },
        Plan::Pro => PlanLimits {
            hook_per_month: 500,
            script_per_month: 300,
            shotlist_per_month: 300,
            voiceover_per_month: 300,
            caption_per_month: 500,
            broll_per_month: 300,
            calendar_per_month: 20,
            exports_per_month: 200,
        },
        Plan::Enterprise => PlanLimits {
            hook_per_month: UNLIMITED,
            script_per_month: UNLIMITED,
            shotlist_per_month: UNLIMITED,
            voiceover_per_month: UNLIMITED,
            caption_per_month: UNLIMITED,
            broll_per_month: UNLIMITED,
            calendar_per_month: UNLIMITED,
            exports_per_month: UNLIMITED,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_is_total_over_all_plans_and_categories() {
        for plan in Plan::ALL {
            let table = limits(plan);
            for category in Category::ALL {
                let limit = table.limit_for(category);
                assert!(limit == UNLIMITED || limit > 0);
            }
        }
    }

    #[test]
    fn enterprise_is_unlimited_everywhere() {
        for category in Category::ALL {
            assert_eq!(limits(Plan::Enterprise).limit_for(category), UNLIMITED);
        }
    }

    #[test]
    fn free_plan_matches_published_ceilings() {
        let free = limits(Plan::Free);
        assert_eq!(free.limit_for(Category::Hook), 5);
        assert_eq!(free.limit_for(Category::Calendar), 1);
        assert_eq!(free.limit_for(Category::Export), 2);
    }

    #[test]
    fn plan_string_round_trip() {
        for plan in Plan::ALL {
            assert_eq!(Plan::from_string(plan.as_str()), plan);
        }
        assert_eq!(Plan::from_string("unknown"), Plan::Free);
    }

    #[test]
    fn category_string_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_string(category.as_str()), Some(category));
        }
        assert_eq!(Category::from_string("unknown"), None);
    }
}
