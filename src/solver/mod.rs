/*!
The theory-SAT coordination machinery.

The modules here follow the data flow of a solve:

- [filter] tightens the box from simple bound assertions, possibly closing the search before anything else runs.
- [abstractor] replaces theory atoms by fresh Boolean proxies.
- [cnfizer] turns the abstracted formulas into clauses.
- [sat_driver] feeds the clauses to the CDCL engine and prunes each candidate model to its main-active literals.
- [theory] turns enabled theory literals into rows of an exact rational LP and checks their joint feasibility.
- [context] owns all of the above, the assertion stack, and the learn-and-refute loop.
*/

pub mod abstractor;
pub mod cnfizer;
pub mod context;
pub mod filter;
pub mod sat_driver;
pub mod scoped_vector;
pub mod theory;
