pub struct StriderConfig;

impl StriderConfig {
    // Simulation Parameters
    pub const DT: f32 = 1.0 / 60.0;
    pub const SOLVER_ITERATIONS: usize = 8;
    pub const GRAVITY: f32 = -9.81;

    // Frame dt is clamped to this before anything reads it. Larger steps
    // over-advance the gait and blow up the joint motors.
    pub const MAX_FRAME_DT: f32 = 1.0 / 30.0;

    // Motor Parameters (force-based motors, so torques are in N*m)
    pub const MOTOR_MAX_FORCE: f32 = 250.0;

    // Link damping shared by every robot body
    pub const LINEAR_DAMPING: f32 = 0.4;
    pub const ANGULAR_DAMPING: f32 = 1.0;

    // Ground contact
    pub const GROUND_FRICTION: f32 = 1.0;
    pub const FOOT_FRICTION: f32 = 1.2;

    /// Clamp a raw frame delta into `[0, MAX_FRAME_DT]`.
    ///
    /// Negative and non-finite inputs (tab switches, clock jumps) collapse to zero.
    pub fn clamp_dt(raw: f32) -> f32 {
        if !raw.is_finite() || raw <= 0.0 {
            return 0.0;
        }
        raw.min(Self::MAX_FRAME_DT)
    }
}
