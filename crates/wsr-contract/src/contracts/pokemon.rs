use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{to_json, unknown_function, Args, Contract};
use crate::context::TxContext;
use crate::error::{ContractError, ContractResult};
use crate::record::Record;
use crate::store::{HistoryEntry, RecordStore};

/// Power gained on evolution.
pub const EVOLUTION_BONUS: i64 = 30;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub power: i64,
    pub trainer: String,
    pub evolved: bool,
    pub location: String,
}

impl Record for Pokemon {
    const KIND: &'static str = "Pokemon";

    fn key(&self) -> &str {
        &self.id
    }
}

const POKEMON: RecordStore<Pokemon> = RecordStore::new();

#[derive(Clone, Copy, Debug, Default)]
pub struct PokemonContract;

impl PokemonContract {
    pub const NAME: &'static str = "pokemon";

    #[allow(clippy::too_many_arguments)]
    pub fn create_pokemon(
        &self,
        ctx: &mut TxContext<'_>,
        id: &str,
        name: &str,
        kind: &str,
        trainer: &str,
        location: &str,
        power: i64,
    ) -> ContractResult<Pokemon> {
        let pokemon = Pokemon {
            id: id.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            power,
            trainer: trainer.to_string(),
            evolved: false,
            location: location.to_string(),
        };
        POKEMON.create(ctx, &pokemon)?;
        Ok(pokemon)
    }

    pub fn read_pokemon(&self, ctx: &mut TxContext<'_>, id: &str) -> ContractResult<Pokemon> {
        POKEMON.read(ctx, id)
    }

    /// Hand the Pokemon to `trainer` and set its power.
    pub fn update_pokemon(
        &self,
        ctx: &mut TxContext<'_>,
        id: &str,
        trainer: &str,
        power: i64,
    ) -> ContractResult<Pokemon> {
        POKEMON.update(ctx, id, |p| {
            p.trainer = trainer.to_string();
            p.power = power;
            Ok(())
        })
    }

    /// Evolve once: sets `evolved` and adds [`EVOLUTION_BONUS`] power.
    pub fn evolve_pokemon(&self, ctx: &mut TxContext<'_>, id: &str) -> ContractResult<Pokemon> {
        POKEMON.update(ctx, id, |p| {
            if p.evolved {
                return Err(ContractError::AlreadyInTargetState {
                    kind: Pokemon::KIND,
                    key: p.id.clone(),
                    state: "evolved".into(),
                });
            }
            p.evolved = true;
            p.power = p.power.saturating_add(EVOLUTION_BONUS);
            Ok(())
        })
    }

    pub fn delete_pokemon(&self, ctx: &mut TxContext<'_>, id: &str) -> ContractResult<()> {
        POKEMON.delete(ctx, id)
    }

    pub fn pokemon_exists(&self, ctx: &mut TxContext<'_>, id: &str) -> ContractResult<bool> {
        POKEMON.exists(ctx, id)
    }

    pub fn get_all_pokemon(&self, ctx: &mut TxContext<'_>) -> ContractResult<Vec<Pokemon>> {
        POKEMON.list_all(ctx)?.collect()
    }

    pub fn get_history(
        &self,
        ctx: &mut TxContext<'_>,
        id: &str,
    ) -> ContractResult<Vec<HistoryEntry<Pokemon>>> {
        POKEMON.history(ctx, id)?.collect()
    }
}

impl Contract for PokemonContract {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn functions(&self) -> &'static [&'static str] {
        &[
            "InitLedger",
            "CreatePokemon",
            "ReadPokemon",
            "UpdatePokemon",
            "EvolvePokemon",
            "DeletePokemon",
            "GetHistory",
            "PokemonExists",
            "GetAllPokemon",
        ]
    }

    fn init_ledger(&self, ctx: &mut TxContext<'_>) -> ContractResult<()> {
        let seed = [
            ("poke1", "Pikachu", "Electric", 55, "Ash", "Pallet Town"),
            ("poke2", "Charmander", "Fire", 52, "Red", "Cinnabar Island"),
            ("poke3", "Squirtle", "Water", 48, "Misty", "Cerulean City"),
        ];
        for (id, name, kind, power, trainer, location) in seed {
            let pokemon = Pokemon {
                id: id.into(),
                name: name.into(),
                kind: kind.into(),
                power,
                trainer: trainer.into(),
                evolved: false,
                location: location.into(),
            };
            POKEMON.put(ctx, &pokemon)?;
        }
        Ok(())
    }

    fn invoke(
        &self,
        ctx: &mut TxContext<'_>,
        function: &str,
        args: &[String],
    ) -> ContractResult<Value> {
        match function {
            "InitLedger" => {
                Args::expect(function, args, 0)?;
                self.init_ledger(ctx)?;
                Ok(Value::Null)
            }
            "CreatePokemon" => {
                let a = Args::expect(function, args, 6)?;
                let power = a.parse(5, "power")?;
                to_json(self.create_pokemon(
                    ctx,
                    a.str(0),
                    a.str(1),
                    a.str(2),
                    a.str(3),
                    a.str(4),
                    power,
                )?)
            }
            "ReadPokemon" => {
                let a = Args::expect(function, args, 1)?;
                to_json(self.read_pokemon(ctx, a.str(0))?)
            }
            "UpdatePokemon" => {
                let a = Args::expect(function, args, 3)?;
                let power = a.parse(2, "power")?;
                to_json(self.update_pokemon(ctx, a.str(0), a.str(1), power)?)
            }
            "EvolvePokemon" => {
                let a = Args::expect(function, args, 1)?;
                to_json(self.evolve_pokemon(ctx, a.str(0))?)
            }
            "DeletePokemon" => {
                let a = Args::expect(function, args, 1)?;
                self.delete_pokemon(ctx, a.str(0))?;
                Ok(Value::Null)
            }
            "GetHistory" => {
                let a = Args::expect(function, args, 1)?;
                let lines: Vec<String> = self
                    .get_history(ctx, a.str(0))?
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                to_json(lines)
            }
            "PokemonExists" => {
                let a = Args::expect(function, args, 1)?;
                to_json(self.pokemon_exists(ctx, a.str(0))?)
            }
            "GetAllPokemon" => {
                Args::expect(function, args, 0)?;
                to_json(self.get_all_pokemon(ctx)?)
            }
            other => Err(unknown_function(Self::NAME, other)),
        }
    }
}
