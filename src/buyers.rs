//! Merchandise group → responsible buyer mapping
//!
//! Groups missing from the table resolve to [`UNMAPPED_BUYER`] so the rows
//! stay visible in reports until someone adds the group here or in the
//! `[buyers]` section of the settings file.

use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};

pub const UNMAPPED_BUYER: &str = "NÃO MAPEADO";

const BUILTIN_GROUP_BUYERS: &[(&str, &str)] = &[
    ("QUEIJOS ESPECIAIS", "Anderson"),
    ("EMBUTIDOS/DEFUMADOS", "Anderson"),
    ("PRESUNTARIA/MORTADELA", "Anderson"),
    ("QUEIJOS COMODITIES", "Anderson"),
    ("MARGARINAS/MANTEIGAS", "Anderson"),
    ("REQUEIJAO/QUEIJOS CREMOSOS", "Anderson"),
    ("IOGURTES", "Anderson"),
    ("ANTEPASTOS/SOBREMESAS/APER", "Anderson"),
    ("MASSAS REFRIGERADAS", "Anderson"),
    ("BEBIDAS LACTEAS", "Anderson"),
    ("ARTIGOS CHURRASCO", "Erilana"),
    ("BAZAR", "Erilana"),
    ("BOMBONIERE", "Erilana"),
    ("MERCEARIA DOCE", "Erilana"),
    ("MATINAIS", "Erilana"),
    ("PLANTAS", "Erilana"),
    ("BEBIDAS NAO ALCOOLICAS", "Andreia Silva"),
    ("BEBIDAS ALCOOLICAS", "Andreia Silva"),
    ("SUPLEMENTOS NUTRICIONAIS", "Andreia Silva"),
    ("MAT.P/CONVENIENCIA/PADARIA", "Euclides"),
    ("MAT.P/COPA E COZINHA", "Euclides"),
    ("INSUMOS", "Euclides"),
    ("MAT.SEG.PROT.UNIFORM", "Euclides"),
    ("MEDICAMENTOS", "Euclides"),
    ("PECAS P/VEICULOS", "Euclides"),
    ("MAT.MANUT.MECANICA", "Euclides"),
    ("SERV.MANUT.VEICULOS", "Euclides"),
    ("COMBUSTIVEIS", "Euclides"),
    ("MAT.DE ESCRITORIO", "Euclides"),
    ("UTENSILIOS E ACESSOR", "Euclides"),
    ("EQPTOS.USADOS C/COND - GP 2", "Euclides"),
    ("MAT. DE REFRIGERACAO", "Euclides"),
    ("MAT.DE LIMPEZA", "Euclides"),
    ("MAT.DE EMBALAGENS", "Euclides"),
    ("MAT.DIVERSOS", "Euclides"),
    ("FERRAM. E ACESSORIOS", "Euclides"),
    ("MAT.DE IMOBILIZADO", "Euclides"),
    ("MAT.MANUT.ELETRICA", "Euclides"),
    ("MAO-DE-OBRA REFORMAS/MANUTENC", "Euclides"),
    ("OUTROS INVESTIMENTOS", "Euclides"),
    ("AQUIS. EQUIP. P/REESTUTURACAO", "Euclides"),
    ("CESTA BASICA - FUNCIONARIOS", "Euclides"),
    ("MATS/EQUIP.COHATRAC3", "Euclides"),
    ("OBRAS CIVIS", "Euclides"),
    ("OLEOS E LUBRIFICANTES", "Euclides"),
    ("OUTRAS DESP.C/PESSOAL", "Euclides"),
    ("PROPAGANDAS/PUBLIC.", "Euclides"),
    ("EVENTOS E COMEMORACOES", "Euclides"),
    ("MAT. E EMBALAGENS E-COMMERCE", "Euclides"),
    ("MAT. PARA LAVAGEM VEICULOS", "Euclides"),
    ("DOACÕES E BRINDES", "Euclides"),
    ("MATS/EQUIP. COHAMA", "Euclides"),
    ("DIANTEIRA C/ OSSO", "Glacirene"),
    ("DIANTEIRA S/ OSSO", "Glacirene"),
    ("TRASEIRA S/ OSSO", "Glacirene"),
    ("AVES", "Glacirene"),
    ("TRASEIRA C/ OSSO", "Glacirene"),
    ("INDUSTRIALIZADOS", "Glacirene"),
    ("MIUDOS", "Glacirene"),
    ("SUINOS", "Glacirene"),
    ("PONTA DA AGULHA", "Glacirene"),
    ("OVINOS", "Glacirene"),
    ("OSSO E SEBO", "Glacirene"),
    ("PEIXES / MARISCOS", "Glacirene"),
    ("ANIMAIS", "Glacirene"),
    ("FRUTAS", "Joao"),
    ("LEGUMES", "Joao"),
    ("VERDURAS", "Joao"),
    ("OVOS", "Joao"),
    ("CONGELADOS", "Joseane"),
    ("TEMPEROS/CONDIMENTOS", "Joseane"),
    ("APERITIVOS/SALGADINHOS", "Joseane"),
    ("AZEITES/OLEOS", "Joseane"),
    ("FARINACEOS/FERMENTOS", "Joseane"),
    ("CONSERVAS", "Joseane"),
    ("MASSAS", "Joseane"),
    ("MOLHOS/ATOMATADOS", "Joseane"),
    ("SOPAS", "Joseane"),
    ("GRAOS", "Joseane"),
    ("LIMPEZA", "Marcelo"),
    ("HIGIENE E PERFUMARIA", "Marcelo"),
    ("DESCARTAVEIS", "Marcelo"),
    ("FRUTAS SECAS", "Renato"),
    ("ROTISSERIA", "Renato"),
    ("CONFEITARIA DOCE", "Renato"),
    ("GERAL", "Renato"),
    ("CONFEITARIA SALGADA", "Renato"),
    ("BACALHAU", "Renato"),
    ("MATERIA-PRIMA", "Renato"),
    ("PADARIA", "Renato"),
    ("ENCOMENDAS", "Renato"),
    ("DOCURAS", "Renato"),
    ("SOBREMESAS / CREMES", "Renato"),
    ("ACAIS", "Renato"),
    ("CAFETERIA", "Renato"),
    ("SANDUICHES TRADICIONAIS", "Renato"),
    ("ALMOCO", "Renato"),
    ("ADICIONAIS", "Renato"),
    ("BEBIDAS", "Renato"),
    ("LANCHES DA CASA", "Renato"),
    ("HAMBUGUERES", "Renato"),
    ("SALGADOS", "Renato"),
    ("BEIRUTES", "Renato"),
    ("PADARIA INDUSTRIALIZADO", "Renato"),
    ("CAFE DA MANHA", "Renato"),
    ("APERITIVOS WB", "Renato"),
    ("CREPIOCAS", "Renato"),
    ("OMELETES", "Renato"),
    ("PIZZAS", "Renato"),
    ("SALADAS E PRATOS", "Renato"),
    ("SALADAS DE FRUTA", "Renato"),
    ("SUCOS NATURAIS", "Renato"),
    ("TAPIOCAS", "Renato"),
];

static BUILTIN: Lazy<ProductBuyerMap> = Lazy::new(|| ProductBuyerMap {
    map: BUILTIN_GROUP_BUYERS
        .iter()
        .map(|(group, buyer)| (group.to_string(), buyer.to_string()))
        .collect(),
});

/// Aggregate figures about the mapping table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingStats {
    pub total_groups: usize,
    pub total_buyers: usize,
    pub groups_per_buyer: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductBuyerMap {
    map: HashMap<String, String>,
}

impl Default for ProductBuyerMap {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

impl ProductBuyerMap {
    /// The built-in table shared by the whole process
    pub fn builtin() -> &'static ProductBuyerMap {
        &BUILTIN
    }

    /// Built-in table with `overrides` added on top (overrides win)
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut map = BUILTIN.map.clone();
        for (group, buyer) in overrides {
            map.insert(group.trim().to_string(), buyer.trim().to_string());
        }
        Self { map }
    }

    /// Buyer responsible for `group`, or [`UNMAPPED_BUYER`]
    pub fn buyer_for(&self, group: &str) -> &str {
        let group = group.trim();
        if group.is_empty() {
            return UNMAPPED_BUYER;
        }
        self.map
            .get(group)
            .map(String::as_str)
            .unwrap_or(UNMAPPED_BUYER)
    }

    pub fn is_mapped(&self, group: &str) -> bool {
        self.map.contains_key(group.trim())
    }

    /// Groups handled by `buyer`, sorted
    pub fn groups_for(&self, buyer: &str) -> Vec<&str> {
        let mut groups: Vec<&str> = self
            .map
            .iter()
            .filter(|(_, b)| b.as_str() == buyer)
            .map(|(g, _)| g.as_str())
            .collect();
        groups.sort_unstable();
        groups
    }

    pub fn stats(&self) -> MappingStats {
        let mut groups_per_buyer = BTreeMap::new();
        for buyer in self.map.values() {
            *groups_per_buyer.entry(buyer.clone()).or_insert(0) += 1;
        }
        MappingStats {
            total_groups: self.map.len(),
            total_buyers: groups_per_buyer.len(),
            groups_per_buyer,
        }
    }
}
