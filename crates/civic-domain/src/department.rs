//! Department module - the service context a conversation is filed under

/// Department context selecting which rule table the assistant consults
///
/// Each department keeps its own conversation partition:
/// - Home: the general portal landing page
/// - Tax: Tax Office (TaxCentral)
/// - Vehicle: Vehicle Services (AutoReg)
/// - Benefits: Unemployment assistance (LaborAssist)
/// - Housing: Housing Authority (CityHomes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Department {
    /// General portal context
    #[default]
    Home,

    /// Tax Office
    Tax,

    /// Vehicle Services
    Vehicle,

    /// Unemployment / labor benefits
    Benefits,

    /// Housing Authority
    Housing,
}

/// Icon shown next to a department in navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
    /// Grid of tiles (portal home)
    Grid,
    /// Government building
    Landmark,
    /// Automobile
    Car,
    /// Briefcase
    Briefcase,
    /// House
    House,
}

impl Icon {
    /// Short terminal-friendly label for the icon
    pub fn glyph(&self) -> &'static str {
        match self {
            Icon::Grid => "[#]",
            Icon::Landmark => "[$]",
            Icon::Car => "[=]",
            Icon::Briefcase => "[&]",
            Icon::House => "[^]",
        }
    }
}

/// Static presentation data for a department
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepartmentProfile {
    /// Display name (e.g., "Tax Office")
    pub name: &'static str,

    /// Service brand (e.g., "TaxCentral")
    pub brand: &'static str,

    /// Landing page headline
    pub hero_title: &'static str,

    /// Landing page tagline
    pub hero_subtitle: &'static str,

    /// Example question offered to the user
    pub query_suggestion: &'static str,

    /// Navigation icon
    pub icon: Icon,
}

const HOME: DepartmentProfile = DepartmentProfile {
    name: "CivicSphere",
    brand: "CivicSphere",
    hero_title: "Welcome to CivicSphere",
    hero_subtitle: "The Unified Citizen Services Portal",
    query_suggestion: "How do I file my taxes?",
    icon: Icon::Grid,
};

const TAX: DepartmentProfile = DepartmentProfile {
    name: "Tax Office",
    brand: "TaxCentral",
    hero_title: "File Your Taxes with Confidence",
    hero_subtitle: "Our automated systems help you navigate the new fiscal year regulations.",
    query_suggestion: "What documents do I need to file my tax return?",
    icon: Icon::Landmark,
};

const VEHICLE: DepartmentProfile = DepartmentProfile {
    name: "Vehicle Services",
    brand: "AutoReg",
    hero_title: "Vehicle Services Portal",
    hero_subtitle: "Renew registrations, pay fines, and manage titles online.",
    query_suggestion: "How much is the renewal fee?",
    icon: Icon::Car,
};

const BENEFITS: DepartmentProfile = DepartmentProfile {
    name: "Unemployment",
    brand: "LaborAssist",
    hero_title: "Unemployment Assistance",
    hero_subtitle: "Supporting the workforce during transitions with financial aid and job placement.",
    query_suggestion: "Am I eligible if I quit?",
    icon: Icon::Briefcase,
};

const HOUSING: DepartmentProfile = DepartmentProfile {
    name: "Housing Authority",
    brand: "CityHomes",
    hero_title: "Affordable Housing Initiative",
    hero_subtitle: "Connecting families with safe, affordable, and sustainable housing options.",
    query_suggestion: "What is the income limit?",
    icon: Icon::House,
};

impl Department {
    /// Every department, home first
    pub const ALL: [Department; 5] = [
        Department::Home,
        Department::Tax,
        Department::Vehicle,
        Department::Benefits,
        Department::Housing,
    ];

    /// Get the department identifier as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Home => "home",
            Department::Tax => "tax",
            Department::Vehicle => "vehicle",
            Department::Benefits => "benefits",
            Department::Housing => "housing",
        }
    }

    /// Parse a department from its identifier (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "home" => Some(Department::Home),
            "tax" => Some(Department::Tax),
            "vehicle" => Some(Department::Vehicle),
            "benefits" => Some(Department::Benefits),
            "housing" => Some(Department::Housing),
            _ => None,
        }
    }

    /// Whether this is the general home context
    pub fn is_home(&self) -> bool {
        matches!(self, Department::Home)
    }

    /// Presentation profile for this department
    pub fn profile(&self) -> &'static DepartmentProfile {
        match self {
            Department::Home => &HOME,
            Department::Tax => &TAX,
            Department::Vehicle => &VEHICLE,
            Department::Benefits => &BENEFITS,
            Department::Housing => &HOUSING,
        }
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Department {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid department: {}", s))
    }
}
