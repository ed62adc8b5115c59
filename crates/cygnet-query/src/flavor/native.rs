//! In-process flavor: the neutral traversal is the program

use super::{Flavor, FlavorEmitter, TraversalProgram};
use crate::lower::LoweredQuery;
use cygnet_core::{ParameterMap, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEmitter;

impl FlavorEmitter for NativeEmitter {
    fn flavor(&self) -> Flavor {
        Flavor::Native
    }

    fn emit(&self, query: LoweredQuery, parameters: &ParameterMap) -> Result<TraversalProgram> {
        Ok(TraversalProgram::Native {
            traversal: query.traversal,
            parameters: parameters.clone(),
            columns: query.columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{GremlinSteps, Traversal};

    #[test]
    fn test_native_keeps_traversal() {
        let traversal = Traversal::new().v().as_("n");
        let query = LoweredQuery {
            traversal: traversal.clone(),
            columns: vec!["n".to_string()],
            projected: vec!["n".to_string()],
        };
        let program = NativeEmitter.emit(query, &ParameterMap::new()).unwrap();
        assert_eq!(program.traversal(), Some(&traversal));
        assert_eq!(program.text(), None);
        assert_eq!(program.columns(), ["n".to_string()]);
    }
}
