//! Physical presets and engine limits.

/// Maximum number of vertices a polygon shape may have.
pub const POLYGON_MAX_VERTICES: usize = 16;

/// Maximum number of control points on a spline constraint path.
pub const SPLINE_MAX_CONTROL_POINTS: usize = 64;

/// Coarse samples spread across all spline segments when searching for the
/// closest point.
pub const SPLINE_SAMPLES: usize = 100;

/// Golden-section search tolerance on the spline parameter.
pub const SPLINE_TOLERANCE: f64 = 1e-3;

/// Default penetration allowance before position correction kicks in.
pub const CORRECTION_SLOP: f64 = 0.05;

// Gravitational accelerations (m/s²)

/// Earth.
pub const GRAV_EARTH: f64 = 9.81;
/// Moon.
pub const GRAV_MOON: f64 = 1.62;
/// Mars.
pub const GRAV_MARS: f64 = 3.7;
/// Jupiter.
pub const GRAV_JUPITER: f64 = 24.5;
/// Sun.
pub const GRAV_SUN: f64 = 275.0;
/// No gravity.
pub const GRAV_VOID: f64 = 0.0;

// Coefficients of restitution

/// Plastic.
pub const COR_PLASTIC: f64 = 0.96;
/// Resin.
pub const COR_RESIN: f64 = 0.8;
/// Steel.
pub const COR_STEEL: f64 = 0.67;
/// Glass.
pub const COR_GLASS: f64 = 0.55;
/// Wood.
pub const COR_WOOD: f64 = 0.39;
/// Cardboard.
pub const COR_CARDBOARD: f64 = 0.16;

// Densities (g/cm³)

/// Gold.
pub const DENSITY_GOLD: f64 = 19.3;
/// Steel.
pub const DENSITY_STEEL: f64 = 7.8;
/// Glass.
pub const DENSITY_GLASS: f64 = 2.5;
/// Wood.
pub const DENSITY_WOOD: f64 = 1.5;
/// Cardboard.
pub const DENSITY_CARDBOARD: f64 = 0.7;
/// Helium.
pub const DENSITY_HELIUM: f64 = 0.000_178;
